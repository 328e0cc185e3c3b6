//! 容器构建器与容器
//!
//! 构建器收集一次配置过程中的全部注册和构建回调，构建后得到只读的容器。

use crate::object::{SceneObject, World};
use crate::template::ObjectTemplate;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use scope_abstractions::Resolve;
use state_common::{slot_of, DependencyError, Lifetime, ScopeInfo, ServiceSlot, TypeInfo};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 服务工厂函数类型
pub type ServiceFactory =
    Arc<dyn Fn(&dyn Resolve) -> Result<ServiceSlot, DependencyError> + Send + Sync>;

/// 容器构建完成后执行的回调
pub type BuildCallback = Box<dyn FnOnce(&dyn Resolve) -> Result<(), DependencyError> + Send>;

enum Provider {
    Instance(ServiceSlot),
    Factory {
        lifetime: Lifetime,
        factory: ServiceFactory,
        cache: OnceCell<ServiceSlot>,
    },
}

/// 服务注册信息
struct ServiceRegistration {
    type_info: TypeInfo,
    provider: Provider,
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provider = match &self.provider {
            Provider::Instance(_) => "instance".to_string(),
            Provider::Factory { lifetime, .. } => format!("factory({lifetime:?})"),
        };
        f.debug_struct("ServiceRegistration")
            .field("type", &self.type_info.name)
            .field("provider", &provider)
            .finish()
    }
}

/// 容器构建器
///
/// 作用域在配置阶段把它交给配置器；同一类型重复注册时后注册的生效。
pub struct ContainerBuilder {
    scope: ScopeInfo,
    world: Arc<World>,
    registrations: Vec<ServiceRegistration>,
    build_callbacks: Vec<BuildCallback>,
    instantiated: Vec<Arc<SceneObject>>,
}

pub(crate) struct BuiltContainer {
    pub(crate) container: Container,
    pub(crate) callbacks: Vec<BuildCallback>,
    pub(crate) instantiated: Vec<Arc<SceneObject>>,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new(scope: ScopeInfo, world: Arc<World>) -> Self {
        Self {
            scope,
            world,
            registrations: Vec::new(),
            build_callbacks: Vec::new(),
            instantiated: Vec::new(),
        }
    }

    /// 正在构建的作用域
    pub fn scope(&self) -> &ScopeInfo {
        &self.scope
    }

    /// 对象所在的世界
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// 注册实例，以 `T` 为键
    pub fn register_instance<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_slot(TypeInfo::of::<T>(), slot_of(instance))
    }

    /// 注册类型擦除的实例
    pub fn register_slot(&mut self, type_info: TypeInfo, slot: ServiceSlot) -> &mut Self {
        self.push(ServiceRegistration {
            type_info,
            provider: Provider::Instance(slot),
        })
    }

    /// 注册工厂，以 `T` 为键
    pub fn register_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolve) -> Result<Arc<T>, DependencyError> + Send + Sync + 'static,
    {
        self.register_slot_factory(TypeInfo::of::<T>(), lifetime, move |resolver| {
            factory(resolver).map(slot_of::<T>)
        })
    }

    /// 注册类型擦除的工厂
    pub fn register_slot_factory<F>(
        &mut self,
        type_info: TypeInfo,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&dyn Resolve) -> Result<ServiceSlot, DependencyError> + Send + Sync + 'static,
    {
        self.push(ServiceRegistration {
            type_info,
            provider: Provider::Factory {
                lifetime,
                factory: Arc::new(factory),
                cache: OnceCell::new(),
            },
        })
    }

    /// 注册构建回调，容器构建完成后按注册顺序执行
    pub fn register_build_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&dyn Resolve) -> Result<(), DependencyError> + Send + 'static,
    {
        self.build_callbacks.push(Box::new(callback));
        self
    }

    /// 检查是否已注册（使用 TypeId）
    pub fn is_registered(&self, type_id: TypeId) -> bool {
        self.registrations
            .iter()
            .any(|registration| registration.type_info.id == type_id)
    }

    /// 已注册的服务数量（含被覆盖的注册）
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// 实例化对象模板，对象归属于正在构建的作用域
    pub fn instantiate(&mut self, template: &Arc<ObjectTemplate>) -> Arc<SceneObject> {
        let object = self.world.spawn(template);
        self.instantiated.push(object.clone());
        object
    }

    fn push(&mut self, registration: ServiceRegistration) -> &mut Self {
        if self.is_registered(registration.type_info.id) {
            debug!(
                "作用域 {} 覆盖注册: {}",
                self.scope.name, registration.type_info.name
            );
        }
        self.registrations.push(registration);
        self
    }

    pub(crate) fn build(self) -> BuiltContainer {
        let mut services = HashMap::with_capacity(self.registrations.len());
        for registration in self.registrations {
            services.insert(registration.type_info.id, registration);
        }

        BuiltContainer {
            container: Container {
                scope: self.scope,
                services,
                resolving: Mutex::new(Vec::new()),
            },
            callbacks: self.build_callbacks,
            instantiated: self.instantiated,
        }
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("scope", &self.scope.name)
            .field("registrations", &self.registrations)
            .field("build_callbacks", &self.build_callbacks.len())
            .finish()
    }
}

/// 构建完成的容器
///
/// 只负责本作用域的注册，父作用域回退由 [`crate::ScopeNode`] 处理。
pub struct Container {
    scope: ScopeInfo,
    services: HashMap<TypeId, ServiceRegistration>,
    resolving: Mutex<Vec<TypeInfo>>,
}

impl Container {
    /// 是否注册了指定类型
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.services.contains_key(&type_id)
    }

    /// 已注册的服务类型
    pub fn registered_types(&self) -> Vec<TypeInfo> {
        self.services
            .values()
            .map(|registration| registration.type_info.clone())
            .collect()
    }

    /// 在本容器内解析，未注册时返回 `None`
    ///
    /// `owner` 是拥有本容器的作用域，工厂通过它解析自己的依赖。
    pub(crate) fn resolve_local(
        &self,
        type_info: &TypeInfo,
        owner: &dyn Resolve,
    ) -> Option<Result<ServiceSlot, DependencyError>> {
        let registration = self.services.get(&type_info.id)?;
        let result = match &registration.provider {
            Provider::Instance(slot) => Ok(slot.clone()),
            Provider::Factory {
                lifetime,
                factory,
                cache,
            } => match cache.get() {
                Some(slot) => Ok(slot.clone()),
                None => {
                    let created = self.invoke(&registration.type_info, factory, owner);
                    if lifetime.is_cached() {
                        created.map(|slot| cache.get_or_init(|| slot).clone())
                    } else {
                        created
                    }
                }
            },
        };
        Some(result)
    }

    fn invoke(
        &self,
        type_info: &TypeInfo,
        factory: &ServiceFactory,
        owner: &dyn Resolve,
    ) -> Result<ServiceSlot, DependencyError> {
        {
            let mut chain = self.resolving.lock();
            if chain.iter().any(|pending| pending.id == type_info.id) {
                let names = chain
                    .iter()
                    .map(|pending| pending.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DependencyError::CircularDependency {
                    dependency_chain: format!("{} -> {}", names, type_info.name),
                });
            }
            chain.push(type_info.clone());
        }

        let created = factory(owner);

        let mut chain = self.resolving.lock();
        if let Some(position) = chain.iter().rposition(|pending| pending.id == type_info.id) {
            chain.remove(position);
        }
        created
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.scope.name)
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_abstractions::ResolveExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 只由单个容器组成的解析器
    struct Standalone(Container);

    impl Resolve for Standalone {
        fn resolve_slot(&self, type_info: &TypeInfo) -> Result<ServiceSlot, DependencyError> {
            self.0
                .resolve_local(type_info, self)
                .unwrap_or_else(|| Err(DependencyError::not_registered(&type_info.name)))
        }

        fn can_resolve_by_type_id(&self, type_id: TypeId) -> bool {
            self.0.contains(type_id)
        }
    }

    fn builder() -> ContainerBuilder {
        ContainerBuilder::new(ScopeInfo::new("test"), Arc::new(World::new()))
    }

    #[derive(Debug)]
    struct Counter(usize);

    #[test]
    fn singleton_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut builder = builder();
        builder.register_factory::<Counter, _>(Lifetime::Singleton, move |_| {
            Ok(Arc::new(Counter(seen.fetch_add(1, Ordering::SeqCst))))
        });

        let resolver = Standalone(builder.build().container);
        let first = resolver.resolve::<Counter>().unwrap();
        let second = resolver.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_factory_runs_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut builder = builder();
        builder.register_factory::<Counter, _>(Lifetime::Transient, move |_| {
            Ok(Arc::new(Counter(seen.fetch_add(1, Ordering::SeqCst))))
        });

        let resolver = Standalone(builder.build().container);
        assert_eq!(resolver.resolve::<Counter>().unwrap().0, 0);
        assert_eq!(resolver.resolve::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn later_registration_wins() {
        let mut builder = builder();
        builder
            .register_instance(Arc::new(Counter(1)))
            .register_instance(Arc::new(Counter(2)));
        assert_eq!(builder.registration_count(), 2);

        let resolver = Standalone(builder.build().container);
        assert_eq!(resolver.resolve::<Counter>().unwrap().0, 2);
    }

    #[derive(Debug)]
    struct Ping;
    #[derive(Debug)]
    struct Pong;

    #[test]
    fn circular_factories_are_reported() {
        let mut builder = builder();
        builder
            .register_factory::<Ping, _>(Lifetime::Singleton, |resolver| {
                resolver.resolve::<Pong>()?;
                Ok(Arc::new(Ping))
            })
            .register_factory::<Pong, _>(Lifetime::Singleton, |resolver| {
                resolver.resolve::<Ping>()?;
                Ok(Arc::new(Pong))
            });

        let resolver = Standalone(builder.build().container);
        let err = resolver.resolve::<Ping>().unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }), "{err}");
    }

    #[test]
    fn build_callbacks_keep_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut builder = builder();
        for index in 0..3 {
            let order = order.clone();
            builder.register_build_callback(move |_| {
                order.lock().push(index);
                Ok(())
            });
        }

        let built = builder.build();
        let resolver = Standalone(built.container);
        for callback in built.callbacks {
            callback(&resolver).unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
