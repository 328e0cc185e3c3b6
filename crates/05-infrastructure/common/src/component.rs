//! 组件句柄与能力表
//!
//! 对象上挂载的每个组件都带有一张显式的能力表：能力类型 → 提供者。
//! 注册和能力查询都走这张表，不做运行时类型探测。

use crate::metadata::TypeInfo;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的服务槽
///
/// 槽内实际保存的是 `Arc<T>`（`T` 可以是 `dyn Trait`），用 [`downcast_slot`] 取回。
pub type ServiceSlot = Arc<dyn Any + Send + Sync>;

/// 将实例包装为服务槽
pub fn slot_of<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> ServiceSlot {
    Arc::new(instance)
}

/// 从服务槽取回具体类型
pub fn downcast_slot<T: ?Sized + Send + Sync + 'static>(slot: &ServiceSlot) -> Option<Arc<T>> {
    slot.downcast_ref::<Arc<T>>().cloned()
}

/// 挂载在对象上的组件
///
/// 组件总是以自身的具体类型暴露，其余能力需要通过 [`ComponentHandle::with_capability`] 声明。
pub struct ComponentHandle {
    type_info: TypeInfo,
    capabilities: Vec<(TypeInfo, ServiceSlot)>,
}

impl ComponentHandle {
    /// 创建组件句柄
    pub fn new<C: Send + Sync + 'static>(component: Arc<C>) -> Self {
        let type_info = TypeInfo::of::<C>();
        Self {
            capabilities: vec![(type_info.clone(), slot_of(component))],
            type_info,
        }
    }

    /// 声明组件提供的能力
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use state_common::ComponentHandle;
    /// trait Audio: Send + Sync {}
    /// struct Mixer;
    /// impl Audio for Mixer {}
    ///
    /// let mixer = Arc::new(Mixer);
    /// let handle = ComponentHandle::new(mixer.clone()).with_capability::<dyn Audio>(mixer);
    /// assert!(handle.capability::<dyn Audio>().is_some());
    /// ```
    pub fn with_capability<T: ?Sized + Send + Sync + 'static>(mut self, provider: Arc<T>) -> Self {
        let info = TypeInfo::of::<T>();
        self.capabilities.retain(|(existing, _)| existing.id != info.id);
        self.capabilities.push((info, slot_of(provider)));
        self
    }

    /// 组件的具体类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 组件名称
    pub fn name(&self) -> &str {
        self.type_info.short_name()
    }

    /// 按能力类型查找提供者
    pub fn capability<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.capability_slot(TypeId::of::<T>())
            .and_then(|slot| downcast_slot::<T>(&slot))
    }

    /// 按能力 [`TypeId`] 查找类型擦除的提供者
    pub fn capability_slot(&self, type_id: TypeId) -> Option<ServiceSlot> {
        self.capabilities
            .iter()
            .find(|(info, _)| info.id == type_id)
            .map(|(_, slot)| slot.clone())
    }

    /// 是否提供指定能力
    pub fn has_capability(&self, type_id: TypeId) -> bool {
        self.capabilities.iter().any(|(info, _)| info.id == type_id)
    }

    /// 组件声明的全部能力，按声明顺序
    pub fn capabilities(&self) -> impl Iterator<Item = &TypeInfo> {
        self.capabilities.iter().map(|(info, _)| info)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("type", &self.type_info.name)
            .field(
                "capabilities",
                &self.capabilities().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn label(&self) -> &str;
    }

    struct Banner(&'static str);

    impl Named for Banner {
        fn label(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn concrete_type_is_always_exposed() {
        let handle = ComponentHandle::new(Arc::new(Banner("hi")));
        assert!(handle.capability::<Banner>().is_some());
        assert!(handle.capability::<dyn Named>().is_none());
        assert_eq!(handle.name(), "Banner");
    }

    #[test]
    fn declared_capability_resolves_to_same_instance() {
        let banner = Arc::new(Banner("title"));
        let handle = ComponentHandle::new(banner.clone()).with_capability::<dyn Named>(banner.clone());

        let named = handle.capability::<dyn Named>().unwrap();
        assert_eq!(named.label(), "title");
        assert!(Arc::ptr_eq(&handle.capability::<Banner>().unwrap(), &banner));
        assert_eq!(handle.capabilities().count(), 2);
    }

    #[test]
    fn redeclaring_a_capability_replaces_it() {
        let first = Arc::new(Banner("first"));
        let second = Arc::new(Banner("second"));
        let handle = ComponentHandle::new(first.clone())
            .with_capability::<dyn Named>(first)
            .with_capability::<dyn Named>(second);

        assert_eq!(handle.capability::<dyn Named>().unwrap().label(), "second");
        assert_eq!(handle.capabilities().count(), 2);
    }
}
