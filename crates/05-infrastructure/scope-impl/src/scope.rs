//! 作用域树
//!
//! 每个作用域节点拥有自己的注册表，未注册的依赖沿父链回退解析。
//! 父节点持有子节点，子节点只持有父节点的弱引用。

use crate::container::{Container, ContainerBuilder};
use crate::object::{SceneObject, World};
use parking_lot::{Mutex, RwLock};
use scope_abstractions::{Inject, Resolve};
use state_common::{DependencyError, ScopeError, ScopeInfo, ServiceSlot, TypeInfo};
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// 作用域配置器
///
/// 作用域的差异通过配置器组合进来，而不是派生新的作用域类型。
pub trait ScopeConfigurator: Send + Sync {
    /// 向构建器注册本作用域的服务
    fn configure(&self, builder: &mut ContainerBuilder) -> Result<(), DependencyError>;
}

impl<F> ScopeConfigurator for F
where
    F: Fn(&mut ContainerBuilder) -> Result<(), DependencyError> + Send + Sync,
{
    fn configure(&self, builder: &mut ContainerBuilder) -> Result<(), DependencyError> {
        self(builder)
    }
}

/// 不注册任何服务的配置器
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyConfigurator;

impl ScopeConfigurator for EmptyConfigurator {
    fn configure(&self, _builder: &mut ContainerBuilder) -> Result<(), DependencyError> {
        Ok(())
    }
}

/// 作用域节点
pub struct ScopeNode {
    info: ScopeInfo,
    parent: Option<Weak<ScopeNode>>,
    children: RwLock<Vec<Arc<ScopeNode>>>,
    container: RwLock<Option<Arc<Container>>>,
    configurator: Mutex<Option<Box<dyn ScopeConfigurator>>>,
    configured: AtomicBool,
    disposed: AtomicBool,
    instantiated: Mutex<Vec<Arc<SceneObject>>>,
    world: Arc<World>,
}

impl ScopeNode {
    /// 创建根作用域
    pub fn new_root<C>(name: impl Into<String>, world: Arc<World>, configurator: C) -> Arc<Self>
    where
        C: ScopeConfigurator + 'static,
    {
        Arc::new(Self::build(ScopeInfo::new(name), None, world, Box::new(configurator)))
    }

    /// 创建子作用域，父子关系在创建后不可变
    pub fn new_child<C>(parent: &Arc<Self>, name: impl Into<String>, configurator: C) -> Arc<Self>
    where
        C: ScopeConfigurator + 'static,
    {
        let child = Arc::new(Self::build(
            parent.info.child(name),
            Some(Arc::downgrade(parent)),
            parent.world.clone(),
            Box::new(configurator),
        ));
        parent.children.write().push(child.clone());
        debug!("创建子作用域: {}", child.info.name);
        child
    }

    fn build(
        info: ScopeInfo,
        parent: Option<Weak<Self>>,
        world: Arc<World>,
        configurator: Box<dyn ScopeConfigurator>,
    ) -> Self {
        Self {
            info,
            parent,
            children: RwLock::new(Vec::new()),
            container: RwLock::new(None),
            configurator: Mutex::new(Some(configurator)),
            configured: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            instantiated: Mutex::new(Vec::new()),
            world,
        }
    }

    /// 作用域标识
    pub fn info(&self) -> &ScopeInfo {
        &self.info
    }

    /// 作用域名称
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// 对象世界
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// 父作用域
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// 子作用域，按创建顺序
    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.read().clone()
    }

    /// 是否已配置
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// 本作用域注册的服务类型
    pub fn registered_types(&self) -> Vec<TypeInfo> {
        self.container()
            .map(|container| container.registered_types())
            .unwrap_or_default()
    }

    /// 是否在本作用域内注册（不查父链）
    pub fn is_registered_locally(&self, type_id: TypeId) -> bool {
        self.container()
            .is_some_and(|container| container.contains(type_id))
    }

    /// 本作用域注册过程中实例化的对象
    pub fn instantiated_objects(&self) -> Vec<Arc<SceneObject>> {
        self.instantiated.lock().clone()
    }

    /// 配置并构建作用域，只能调用一次
    ///
    /// 重复调用是编程错误：调试构建下直接断言失败。
    pub fn configure(&self) -> Result<(), ScopeError> {
        if self.is_disposed() {
            return Err(ScopeError::Disposed {
                scope: self.info.name.clone(),
            });
        }
        if self.configured.swap(true, Ordering::SeqCst) {
            error!("作用域重复配置: {}", self.info.name);
            debug_assert!(false, "作用域重复配置: {}", self.info.name);
            return Err(ScopeError::AlreadyConfigured {
                scope: self.info.name.clone(),
            });
        }

        let configurator = self.configurator.lock().take();
        let mut builder = ContainerBuilder::new(self.info.clone(), self.world.clone());
        if let Some(configurator) = configurator {
            configurator.configure(&mut builder)?;
        }

        let built = builder.build();
        let service_count = built.container.registered_types().len();
        self.instantiated.lock().extend(built.instantiated);
        *self.container.write() = Some(Arc::new(built.container));

        for callback in built.callbacks {
            callback(self)?;
        }

        info!(
            "作用域 {} 构建完成，注册了 {} 个服务",
            self.info.name, service_count
        );
        Ok(())
    }

    /// 向外部对象注入依赖
    pub fn inject(&self, target: &dyn Inject) -> Result<(), DependencyError> {
        target.inject(self)
    }

    /// 向对象上所有可注入的组件注入依赖，返回被注入的组件数量
    pub fn inject_object(&self, object: &SceneObject) -> Result<usize, DependencyError> {
        let targets = object.capabilities::<dyn Inject>();
        for target in &targets {
            target.inject(self)?;
        }
        debug!(
            "作用域 {} 向对象 {} 注入了 {} 个组件",
            self.info.name,
            object.name(),
            targets.len()
        );
        Ok(targets.len())
    }

    /// 释放作用域：释放子作用域和注册表，销毁未保留的对象，并从父作用域脱离
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let children = std::mem::take(&mut *self.children.write());
        for child in children {
            child.dispose();
        }

        self.container.write().take();
        self.configurator.lock().take();

        let objects = std::mem::take(&mut *self.instantiated.lock());
        for object in objects.iter().filter(|object| !object.is_persistent()) {
            object.destroy();
        }

        if let Some(parent) = self.parent() {
            parent
                .children
                .write()
                .retain(|child| child.info.id != self.info.id);
        }
        info!("作用域已释放: {}", self.info.name);
    }

    fn container(&self) -> Option<Arc<Container>> {
        self.container.read().clone()
    }
}

impl Resolve for ScopeNode {
    fn resolve_slot(&self, type_info: &TypeInfo) -> Result<ServiceSlot, DependencyError> {
        if self.is_disposed() {
            return Err(DependencyError::ScopeDisposed {
                scope: self.info.name.clone(),
            });
        }
        if let Some(container) = self.container() {
            if let Some(result) = container.resolve_local(type_info, self) {
                return result;
            }
        }
        match self.parent() {
            Some(parent) => parent.resolve_slot(type_info),
            None => Err(DependencyError::not_registered(&type_info.name)),
        }
    }

    fn can_resolve_by_type_id(&self, type_id: TypeId) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.is_registered_locally(type_id)
            || self
                .parent()
                .is_some_and(|parent| parent.can_resolve_by_type_id(type_id))
    }
}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeNode")
            .field("name", &self.info.name)
            .field("id", &self.info.id)
            .field("children", &self.children.read().len())
            .field("configured", &self.is_configured())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
