//! 依赖解析抽象接口
//!
//! 提供按能力类型解析服务和向外部对象注入依赖的能力

use once_cell::sync::OnceCell;
use state_common::{downcast_slot, DependencyError, ServiceSlot, TypeInfo};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// 依赖解析器 trait
///
/// 对象安全的底层接口，泛型解析由 [`ResolveExt`] 提供。
pub trait Resolve: Send + Sync {
    /// 解析类型擦除的服务槽
    fn resolve_slot(&self, type_info: &TypeInfo) -> Result<ServiceSlot, DependencyError>;

    /// 检查是否可以解析指定类型（使用 TypeId）
    fn can_resolve_by_type_id(&self, type_id: TypeId) -> bool;
}

/// 泛型解析扩展
pub trait ResolveExt: Resolve {
    /// 解析指定能力类型
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, DependencyError> {
        let info = TypeInfo::of::<T>();
        let slot = self.resolve_slot(&info)?;
        downcast_slot::<T>(&slot).ok_or(DependencyError::TypeMismatch {
            type_name: info.name,
        })
    }

    /// 解析指定能力类型，未注册时返回 `None`
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        if self.can_resolve::<T>() {
            self.resolve::<T>().ok()
        } else {
            None
        }
    }

    /// 检查是否可以解析指定类型
    fn can_resolve<T: ?Sized + 'static>(&self) -> bool {
        self.can_resolve_by_type_id(TypeId::of::<T>())
    }
}

impl<R: Resolve + ?Sized> ResolveExt for R {}

/// 可注入 trait
///
/// 由作用域在合适的时机调用，从作用域注册表中取出声明的依赖并保存。
pub trait Inject: Send + Sync {
    /// 从解析器注入依赖
    fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError>;
}

/// 延迟注入的依赖字段
///
/// 组件以共享引用持有，注入只发生一次。
pub struct Injected<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Injected<T> {
    /// 创建空字段
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 从解析器填充，已填充时保持原值
    pub fn fill(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
        self.cell.get_or_try_init(|| resolver.resolve::<T>())?;
        Ok(())
    }

    /// 获取已注入的依赖
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// 是否已注入
    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("filled", &self.cell.get().is_some())
            .finish()
    }
}
