//! 组装完成的应用

use crate::controller::{LoadOutcome, StateTransitionController};
use scope_abstractions::StateDescriptor;
use scope_impl::{RootScope, StateHost, StateScope, TemplateCatalog, World};
use state_common::{TransitionError, TransitionResult};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// 组装完成的应用
///
/// 持有对象世界、根作用域、状态宿主和状态切换控制器，按名称加载状态。
pub struct StateApplication {
    world: Arc<World>,
    root: RootScope,
    host: Arc<StateHost>,
    controller: StateTransitionController,
    templates: Arc<TemplateCatalog>,
    states: Vec<StateDescriptor>,
}

impl StateApplication {
    pub(crate) fn new(
        world: Arc<World>,
        root: RootScope,
        host: Arc<StateHost>,
        controller: StateTransitionController,
        templates: Arc<TemplateCatalog>,
        states: Vec<StateDescriptor>,
    ) -> Self {
        Self {
            world,
            root,
            host,
            controller,
            templates,
            states,
        }
    }

    /// 按名称加载状态
    pub async fn load_state(&self, name: &str) -> TransitionResult<LoadOutcome> {
        let descriptor = self.descriptor(name).cloned().ok_or_else(|| {
            error!("状态描述不存在: {}", name);
            TransitionError::MissingDescriptor {
                name: name.to_string(),
            }
        })?;
        self.controller.load_state_async(descriptor).await
    }

    /// 卸载当前状态
    pub async fn unload_state(&self) -> TransitionResult<()> {
        self.controller.unload_state_async().await
    }

    /// 按名称查找状态描述
    pub fn descriptor(&self, name: &str) -> Option<&StateDescriptor> {
        self.states.iter().find(|state| state.name() == name)
    }

    /// 可加载的状态名称，按声明顺序
    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(|state| state.name()).collect()
    }

    /// 当前激活的状态作用域
    pub fn active_state(&self) -> Option<Arc<StateScope>> {
        self.controller.active_slot().get()
    }

    pub fn controller(&self) -> &StateTransitionController {
        &self.controller
    }

    pub fn root(&self) -> &RootScope {
        &self.root
    }

    pub fn host(&self) -> &Arc<StateHost> {
        &self.host
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn templates(&self) -> &Arc<TemplateCatalog> {
        &self.templates
    }

    /// 关闭应用：销毁当前状态，再释放根作用域
    pub fn shutdown(&self) {
        self.controller.shutdown();
        self.root.dispose();
        info!("应用已关闭");
    }
}

impl fmt::Debug for StateApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateApplication")
            .field("root", &self.root)
            .field("controller", &self.controller)
            .field("states", &self.state_names())
            .finish()
    }
}
