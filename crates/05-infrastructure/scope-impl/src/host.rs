//! 状态宿主：实例化模板并挂载、唤醒、启动其承载的状态作用域

use crate::dispatch::ComponentLifecycleDispatcher;
use crate::object::{SceneObject, World};
use crate::scope::ScopeNode;
use crate::slot::ActiveStateSlot;
use crate::state::StateScope;
use crate::template::{Instantiator, ObjectTemplate};
use async_trait::async_trait;
use state_common::LifecycleError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// 状态宿主
///
/// 状态作用域挂在父作用域（通常是根作用域）之下。
pub struct StateHost {
    world: Arc<World>,
    parent: Option<Arc<ScopeNode>>,
    slot: Arc<ActiveStateSlot>,
    dispatcher: Arc<dyn ComponentLifecycleDispatcher>,
}

impl StateHost {
    pub fn new(
        world: Arc<World>,
        parent: Arc<ScopeNode>,
        slot: Arc<ActiveStateSlot>,
        dispatcher: Arc<dyn ComponentLifecycleDispatcher>,
    ) -> Self {
        Self {
            world,
            parent: Some(parent),
            slot,
            dispatcher,
        }
    }

    /// 没有父作用域的宿主，状态作用域各自成为根节点
    pub fn detached(
        world: Arc<World>,
        slot: Arc<ActiveStateSlot>,
        dispatcher: Arc<dyn ComponentLifecycleDispatcher>,
    ) -> Self {
        Self {
            world,
            parent: None,
            slot,
            dispatcher,
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn slot(&self) -> &Arc<ActiveStateSlot> {
        &self.slot
    }

    /// 实例化模板；模板声明了状态时挂载状态作用域并依次 awake、start
    ///
    /// 被去重规则拒绝的实例在返回时已经销毁。
    pub fn spawn(&self, template: &Arc<ObjectTemplate>) -> Result<Arc<SceneObject>, LifecycleError> {
        let object = self.world.spawn(template);
        let Some(definition) = template.state().cloned() else {
            debug!("实例化对象: {}", object.name());
            return Ok(object);
        };

        let scope = StateScope::attach(
            &object,
            self.parent.as_ref(),
            &self.world,
            definition,
            self.slot.clone(),
            self.dispatcher.clone(),
        );
        if let Err(err) = scope.awake() {
            object.destroy();
            return Err(err);
        }
        scope.start()?;
        Ok(object)
    }
}

impl fmt::Debug for StateHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHost")
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("slot", &self.slot)
            .finish()
    }
}

#[async_trait]
impl Instantiator for StateHost {
    async fn instantiate(&self, template: &Arc<ObjectTemplate>) -> Option<Arc<SceneObject>> {
        tokio::task::yield_now().await;
        match self.spawn(template) {
            Ok(object) => Some(object),
            Err(err) => {
                error!("实例化模板 {} 失败: {}", template.name(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoopLifecycleDispatcher;
    use crate::scope::EmptyConfigurator;
    use crate::state::{StateDefinition, StatePolicy};
    use state_common::ScopeState;

    struct Title;
    impl StatePolicy for Title {}

    struct Broken;
    impl StatePolicy for Broken {
        fn configure(
            &self,
            builder: &mut crate::ContainerBuilder,
        ) -> Result<(), state_common::DependencyError> {
            builder.register_build_callback(|_| {
                Err(state_common::DependencyError::creation_failed("Broken", "boom"))
            });
            Ok(())
        }
    }

    fn host() -> StateHost {
        let world = Arc::new(World::new());
        let root = ScopeNode::new_root("root", world.clone(), EmptyConfigurator);
        root.configure().unwrap();
        StateHost::new(
            world,
            root,
            Arc::new(ActiveStateSlot::new()),
            Arc::new(NoopLifecycleDispatcher),
        )
    }

    #[tokio::test]
    async fn instantiating_state_template_activates_it() {
        let host = host();
        let template = Arc::new(ObjectTemplate::new("Title").with_state(StateDefinition::new(Title)));

        let object = host.instantiate(&template).await.unwrap();
        let scope = object.state_scope().unwrap();
        assert_eq!(scope.state(), ScopeState::Active);
        assert!(host.slot().points_to(&scope));
        assert_eq!(scope.node().info().name, "root.Title");
    }

    #[tokio::test]
    async fn plain_templates_have_no_state() {
        let host = host();
        let template = Arc::new(ObjectTemplate::new("Prop"));
        let object = host.instantiate(&template).await.unwrap();
        assert!(object.state_scope().is_none());
        assert!(host.slot().is_empty());
    }

    #[tokio::test]
    async fn failed_awake_yields_nothing() {
        let host = host();
        let template =
            Arc::new(ObjectTemplate::new("Broken").with_state(StateDefinition::new(Broken)));
        assert!(host.instantiate(&template).await.is_none());
        assert_eq!(host.world().live_count(), 0);
    }
}
