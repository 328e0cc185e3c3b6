//! 当前激活状态槽

use crate::object::SceneObject;
use crate::scope::ScopeNode;
use crate::state::StateScope;
use parking_lot::RwLock;
use state_common::DependencyError;
use std::fmt;
use std::sync::{Arc, Weak};

/// 当前激活状态槽
///
/// 由组合根持有并显式注入给状态作用域和状态切换控制器。
/// 槽只保存弱引用，指向的状态被拆除后读取结果为空。
#[derive(Default)]
pub struct ActiveStateSlot {
    current: RwLock<Option<Weak<StateScope>>>,
}

impl ActiveStateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前激活的状态
    pub fn get(&self) -> Option<Arc<StateScope>> {
        self.current
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|scope| scope.is_active())
    }

    /// 是否没有激活状态
    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    /// 槽是否指向指定状态
    pub fn points_to(&self, scope: &StateScope) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|current| std::ptr::eq(current.as_ptr(), scope))
    }

    pub(crate) fn set(&self, scope: &Arc<StateScope>) {
        *self.current.write() = Some(Arc::downgrade(scope));
    }

    /// 仅当槽仍指向 `scope` 时清空
    pub(crate) fn clear_if(&self, scope: &StateScope) -> bool {
        let mut current = self.current.write();
        let matches = current
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), scope));
        if matches {
            *current = None;
        }
        matches
    }

    /// 当前激活状态的作用域节点
    pub fn current_scope(&self) -> Option<Arc<ScopeNode>> {
        self.get().map(|scope| scope.node().clone())
    }

    /// 用当前激活状态的作用域注入对象，没有激活状态时不做任何事
    ///
    /// 返回是否执行了注入。
    pub fn inject_into_current(&self, object: &SceneObject) -> Result<bool, DependencyError> {
        match self.current_scope() {
            Some(scope) => {
                scope.inject_object(object)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for ActiveStateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveStateSlot")
            .field("current", &self.get().map(|scope| scope.name()))
            .finish()
    }
}
