//! 根作用域
//!
//! 进程生命周期的顶层作用域。配置顺序固定：
//! 应用级注册记录 → 全局数据 → 入口点与入口点分发器。

use crate::container::ContainerBuilder;
use crate::object::{SceneObject, World};
use crate::registration::{register_records, RegistrationRecord};
use crate::scope::ScopeNode;
use parking_lot::Mutex;
use scope_abstractions::{AsyncStartable, Resolve, ResolveExt, Startable};
use state_common::{
    slot_of, ComponentHandle, DependencyError, LifecycleError, Lifetime, ScopeError, ServiceSlot,
    TypeInfo,
};
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 全局数据实例，以具体类型为键注册到根作用域
#[derive(Clone)]
pub struct GlobalData {
    type_info: TypeInfo,
    slot: ServiceSlot,
}

impl GlobalData {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            slot: slot_of(value),
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }
}

impl fmt::Debug for GlobalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalData").field(&self.type_info.name).finish()
    }
}

type EntryFactory<E> = Arc<dyn Fn(&dyn Resolve) -> Result<Arc<E>, DependencyError> + Send + Sync>;
type Installer = Arc<dyn Fn(&mut ContainerBuilder) + Send + Sync>;

/// 入口点类型
///
/// 以具体类型注册为单例，并在声明的每个接口下暴露同一个实例。
#[derive(Clone)]
pub struct EntryPointType {
    type_info: TypeInfo,
    interfaces: Vec<TypeInfo>,
    installer: Installer,
}

impl EntryPointType {
    /// 开始声明入口点
    ///
    /// ```ignore
    /// let entry = EntryPointType::new(|_| Ok(Arc::new(Boot)))
    ///     .startable()
    ///     .build();
    /// ```
    pub fn new<E, F>(factory: F) -> EntryPointBuilder<E>
    where
        E: Send + Sync + 'static,
        F: Fn(&dyn Resolve) -> Result<Arc<E>, DependencyError> + Send + Sync + 'static,
    {
        EntryPointBuilder {
            factory: Arc::new(factory),
            interfaces: Vec::new(),
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 声明的接口，按声明顺序
    pub fn interfaces(&self) -> &[TypeInfo] {
        &self.interfaces
    }

    fn install(&self, builder: &mut ContainerBuilder) {
        (self.installer)(builder);
    }
}

impl fmt::Debug for EntryPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointType")
            .field("type", &self.type_info.name)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

/// 入口点构建器
pub struct EntryPointBuilder<E> {
    factory: EntryFactory<E>,
    interfaces: Vec<(TypeInfo, Installer)>,
}

impl<E: Send + Sync + 'static> EntryPointBuilder<E> {
    /// 在接口 `I` 下暴露入口点
    pub fn with_interface<I>(mut self, cast: fn(Arc<E>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let installer: Installer = Arc::new(move |builder: &mut ContainerBuilder| {
            builder.register_factory::<I, _>(Lifetime::Singleton, move |resolver| {
                Ok(cast(resolver.resolve::<E>()?))
            });
        });
        self.interfaces.push((TypeInfo::of::<I>(), installer));
        self
    }

    pub fn startable(self) -> Self
    where
        E: Startable,
    {
        self.with_interface::<dyn Startable>(|entry: Arc<E>| -> Arc<dyn Startable> { entry })
    }

    pub fn async_startable(self) -> Self
    where
        E: AsyncStartable,
    {
        self.with_interface::<dyn AsyncStartable>(|entry: Arc<E>| -> Arc<dyn AsyncStartable> {
            entry
        })
    }

    pub fn build(self) -> EntryPointType {
        let factory = self.factory;
        let installers: Vec<Installer> = self
            .interfaces
            .iter()
            .map(|(_, installer)| installer.clone())
            .collect();
        let installer: Installer = Arc::new(move |builder: &mut ContainerBuilder| {
            let factory = factory.clone();
            builder.register_factory::<E, _>(Lifetime::Singleton, move |resolver| {
                factory(resolver)
            });
            for install in &installers {
                install(builder);
            }
        });

        EntryPointType {
            type_info: TypeInfo::of::<E>(),
            interfaces: self.interfaces.into_iter().map(|(info, _)| info).collect(),
            installer,
        }
    }
}

/// 入口点分发器
///
/// 每个根作用域共享一个，只分发一次：先同步入口点，再异步入口点。
#[derive(Debug, Default)]
pub struct EntryPointDispatcher {
    dispatched: AtomicBool,
}

impl EntryPointDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建器中没有分发器时注册一个
    pub fn ensure_registered(builder: &mut ContainerBuilder) {
        if !builder.is_registered(TypeId::of::<EntryPointDispatcher>()) {
            builder.register_instance(Arc::new(EntryPointDispatcher::new()));
        }
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// 启动入口点，已分发过时返回 `Ok(false)`
    pub async fn dispatch(&self, resolver: &dyn Resolve) -> Result<bool, LifecycleError> {
        if self.dispatched.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        if resolver.can_resolve::<dyn Startable>() {
            let entry = resolver
                .resolve::<dyn Startable>()
                .map_err(ScopeError::from)?;
            entry.start();
            debug!("同步入口点已启动");
        }

        if resolver.can_resolve::<dyn AsyncStartable>() {
            let entry = resolver
                .resolve::<dyn AsyncStartable>()
                .map_err(ScopeError::from)?;
            entry
                .start_async()
                .await
                .map_err(|err| LifecycleError::EntryPointFailed {
                    entry_point: "AsyncStartable".to_string(),
                    message: err.to_string(),
                })?;
            debug!("异步入口点已启动");
        }
        Ok(true)
    }
}

/// 根作用域配置
#[derive(Debug, Clone)]
pub struct RootScopeConfig {
    pub name: String,
    pub dont_destroy_on_load: bool,
    pub components: Vec<RegistrationRecord>,
    pub global_data: Vec<GlobalData>,
    pub entry_point: Option<EntryPointType>,
}

impl Default for RootScopeConfig {
    fn default() -> Self {
        Self {
            name: "Application".to_string(),
            dont_destroy_on_load: true,
            components: Vec::new(),
            global_data: Vec::new(),
            entry_point: None,
        }
    }
}

impl RootScopeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn dont_destroy_on_load(mut self, enabled: bool) -> Self {
        self.dont_destroy_on_load = enabled;
        self
    }

    pub fn with_component(mut self, record: RegistrationRecord) -> Self {
        self.components.push(record);
        self
    }

    pub fn with_global_data(mut self, data: GlobalData) -> Self {
        self.global_data.push(data);
        self
    }

    pub fn with_entry_point(mut self, entry_point: EntryPointType) -> Self {
        self.entry_point = Some(entry_point);
        self
    }
}

/// 根作用域
pub struct RootScope {
    node: Arc<ScopeNode>,
    object: Arc<SceneObject>,
    dont_destroy_on_load: bool,
    components: Arc<Mutex<Vec<Arc<ComponentHandle>>>>,
}

impl RootScope {
    /// 在世界中创建根作用域及其承载对象，尚未配置
    pub fn new(world: Arc<World>, config: RootScopeConfig) -> Self {
        let RootScopeConfig {
            name,
            dont_destroy_on_load,
            components: records,
            global_data,
            entry_point,
        } = config;

        let object = world.spawn_empty(name.clone());
        let components = Arc::new(Mutex::new(Vec::new()));
        let sink = components.clone();
        let node = ScopeNode::new_root(name, world, move |builder: &mut ContainerBuilder| {
            sink.lock().extend(register_records(builder, &records));
            for data in &global_data {
                builder.register_slot(data.type_info.clone(), data.slot.clone());
            }
            if let Some(entry_point) = &entry_point {
                entry_point.install(builder);
                EntryPointDispatcher::ensure_registered(builder);
            }
            Ok(())
        });

        let disposing = node.clone();
        object.on_destroy(move || disposing.dispose());

        Self {
            node,
            object,
            dont_destroy_on_load,
            components,
        }
    }

    /// 标记承载对象、配置作用域并启动入口点
    pub async fn awake(&self) -> Result<(), LifecycleError> {
        if self.dont_destroy_on_load {
            self.object.set_persistent(true);
        }
        self.node.configure()?;

        if let Some(dispatcher) = self.node.try_resolve::<EntryPointDispatcher>() {
            dispatcher.dispatch(self.node.as_ref()).await?;
        }
        info!("根作用域已启动: {}", self.node.name());
        Ok(())
    }

    pub fn node(&self) -> &Arc<ScopeNode> {
        &self.node
    }

    /// 承载对象
    pub fn object(&self) -> &Arc<SceneObject> {
        &self.object
    }

    pub fn registered_components(&self) -> Vec<Arc<ComponentHandle>> {
        self.components.lock().clone()
    }

    /// 销毁承载对象，作用域随之释放
    pub fn dispose(&self) {
        self.object.destroy();
    }
}

impl fmt::Debug for RootScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootScope")
            .field("node", &self.node)
            .field("dont_destroy_on_load", &self.dont_destroy_on_load)
            .finish()
    }
}
