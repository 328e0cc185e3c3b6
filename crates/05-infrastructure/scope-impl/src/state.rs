//! 独占状态作用域
//!
//! 一个状态作用域由承载它的场景对象拥有，生命周期为
//! `Configuring → Starting → Active → Unloading → Destroyed`。
//! 状态之间的差异由 [`StatePolicy`] 组合进来。

use crate::container::ContainerBuilder;
use crate::dispatch::ComponentLifecycleDispatcher;
use crate::object::{SceneObject, World};
use crate::registration::{register_records, RegistrationRecord};
use crate::scope::ScopeNode;
use crate::slot::ActiveStateSlot;
use parking_lot::Mutex;
use scope_abstractions::Resolve;
use state_common::{
    ComponentHandle, DependencyError, LifecycleError, ScopeError, ScopeState, TypeInfo,
};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 状态策略
///
/// 决定状态是否持久、在状态作用域内额外注册哪些服务，以及从父作用域注入哪些依赖。
/// 策略的具体类型就是状态的种类，去重规则按种类比较。
pub trait StatePolicy: Send + Sync + 'static {
    /// 持久状态在被再次请求时保留旧实例，拒绝新实例
    fn persistent(&self) -> bool {
        false
    }

    /// 向状态作用域注册服务
    fn configure(&self, _builder: &mut ContainerBuilder) -> Result<(), DependencyError> {
        Ok(())
    }

    /// 从父作用域注入依赖
    fn inject(&self, _resolver: &dyn Resolve) -> Result<(), DependencyError> {
        Ok(())
    }
}

/// 状态定义
#[derive(Clone)]
pub struct StateDefinition {
    kind: TypeInfo,
    policy: Arc<dyn StatePolicy>,
    components: Vec<RegistrationRecord>,
}

impl StateDefinition {
    /// 以策略创建状态定义，策略类型即状态种类
    pub fn new<P: StatePolicy>(policy: P) -> Self {
        Self {
            kind: TypeInfo::of::<P>(),
            policy: Arc::new(policy),
            components: Vec::new(),
        }
    }

    /// 添加状态作用域内的注册记录
    pub fn with_component(mut self, record: RegistrationRecord) -> Self {
        self.components.push(record);
        self
    }

    pub fn kind(&self) -> &TypeInfo {
        &self.kind
    }

    pub fn persistent(&self) -> bool {
        self.policy.persistent()
    }

    pub fn policy(&self) -> &Arc<dyn StatePolicy> {
        &self.policy
    }

    pub fn components(&self) -> &[RegistrationRecord] {
        &self.components
    }
}

impl fmt::Debug for StateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDefinition")
            .field("kind", &self.kind.name)
            .field("persistent", &self.persistent())
            .field("components", &self.components.len())
            .finish()
    }
}

/// 状态启动结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// 成为当前激活状态
    Activated,
    /// 同种类的持久状态已激活，新实例被销毁
    Rejected,
}

/// 独占状态作用域
pub struct StateScope {
    node: Arc<ScopeNode>,
    owner: Weak<SceneObject>,
    definition: StateDefinition,
    registered: Arc<Mutex<Vec<Arc<ComponentHandle>>>>,
    state: Mutex<ScopeState>,
    slot: Arc<ActiveStateSlot>,
    dispatcher: Arc<dyn ComponentLifecycleDispatcher>,
}

impl StateScope {
    /// 在对象上挂载状态作用域
    ///
    /// 有父作用域时作为其子节点创建，否则作为独立的根节点。
    pub fn attach(
        owner: &Arc<SceneObject>,
        parent: Option<&Arc<ScopeNode>>,
        world: &Arc<World>,
        definition: StateDefinition,
        slot: Arc<ActiveStateSlot>,
        dispatcher: Arc<dyn ComponentLifecycleDispatcher>,
    ) -> Arc<Self> {
        let registered = Arc::new(Mutex::new(Vec::new()));
        let sink = registered.clone();
        let records = definition.components.clone();
        let policy = definition.policy.clone();
        let configurator = move |builder: &mut ContainerBuilder| {
            sink.lock().extend(register_records(builder, &records));
            policy.configure(builder)
        };

        let name = owner.name();
        let node = match parent {
            Some(parent) => ScopeNode::new_child(parent, name, configurator),
            None => ScopeNode::new_root(name, world.clone(), configurator),
        };

        let scope = Arc::new(Self {
            node,
            owner: Arc::downgrade(owner),
            definition,
            registered,
            state: Mutex::new(ScopeState::Configuring),
            slot,
            dispatcher,
        });
        owner.host_state(scope.clone());
        debug!("状态作用域已挂载: {}", scope.name());
        scope
    }

    /// `Configuring → Starting`：配置作用域，并从父作用域注入状态策略
    pub fn awake(&self) -> Result<(), LifecycleError> {
        self.expect_state(ScopeState::Configuring)?;
        self.node.configure()?;
        if let Some(parent) = self.node.parent() {
            self.definition
                .policy
                .inject(parent.as_ref())
                .map_err(ScopeError::from)?;
        }
        *self.state.lock() = ScopeState::Starting;
        Ok(())
    }

    /// `Starting → Active`
    ///
    /// 当前激活状态持久且种类相同时，销毁本实例并返回 [`StartOutcome::Rejected`]；
    /// 否则销毁上一个激活状态的对象，把自己写入激活槽。
    pub fn start(self: &Arc<Self>) -> Result<StartOutcome, LifecycleError> {
        self.expect_state(ScopeState::Starting)?;

        if let Some(previous) = self.slot.get() {
            if !Arc::ptr_eq(&previous, self) {
                if previous.is_persistent() && previous.kind() == self.kind() {
                    warn!(
                        "持久状态 {} 已激活，销毁重复的实例 {}",
                        previous.name(),
                        self.name()
                    );
                    self.destroy_owner();
                    return Ok(StartOutcome::Rejected);
                }
                info!("销毁上一个激活状态: {}", previous.name());
                previous.destroy_owner();
            }
        }

        self.slot.set(self);
        *self.state.lock() = ScopeState::Active;
        if self.is_persistent() {
            if let Some(owner) = self.owner() {
                owner.set_persistent(true);
            }
        }
        info!("状态已激活: {}", self.name());
        Ok(StartOutcome::Activated)
    }

    /// 按注册顺序调用组件的 `on_create_async`
    pub async fn initialize_components(&self) -> Result<usize, LifecycleError> {
        let components = self.registered_components();
        self.dispatcher.dispatch_create(&components).await
    }

    /// 按注册顺序调用组件的 `on_destroy_async`
    pub async fn destroy_components(&self) -> Result<usize, LifecycleError> {
        let components = self.registered_components();
        self.dispatcher.dispatch_destroy(&components).await
    }

    /// 销毁承载对象，对象销毁会拆除本作用域
    pub fn destroy_owner(&self) {
        match self.owner() {
            Some(owner) => owner.destroy(),
            None => self.teardown(),
        }
    }

    /// `→ Unloading → Destroyed`
    pub(crate) fn teardown(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, ScopeState::Unloading | ScopeState::Destroyed) {
                return;
            }
            *state = ScopeState::Unloading;
        }

        self.node.dispose();
        if !self.is_persistent() && self.slot.clear_if(self) {
            debug!("激活槽已清空: {}", self.name());
        }

        *self.state.lock() = ScopeState::Destroyed;
        info!("状态作用域已拆除: {}", self.name());
    }

    fn expect_state(&self, expected: ScopeState) -> Result<(), LifecycleError> {
        let actual = *self.state.lock();
        if actual == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            })
        }
    }

    /// 当前生命周期阶段
    pub fn state(&self) -> ScopeState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ScopeState::Active
    }

    pub fn is_persistent(&self) -> bool {
        self.definition.persistent()
    }

    /// 状态种类
    pub fn kind(&self) -> &TypeInfo {
        &self.definition.kind
    }

    pub fn definition(&self) -> &StateDefinition {
        &self.definition
    }

    /// 状态的作用域节点
    pub fn node(&self) -> &Arc<ScopeNode> {
        &self.node
    }

    /// 承载对象
    pub fn owner(&self) -> Option<Arc<SceneObject>> {
        self.owner.upgrade()
    }

    /// 已注册的组件，按注册顺序
    pub fn registered_components(&self) -> Vec<Arc<ComponentHandle>> {
        self.registered.lock().clone()
    }

    pub fn name(&self) -> String {
        self.node.name().to_string()
    }
}

impl fmt::Debug for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateScope")
            .field("name", &self.node.name())
            .field("kind", &self.definition.kind.name)
            .field("state", &self.state())
            .field("persistent", &self.is_persistent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AsyncLifecycleDispatcher;
    use crate::scope::EmptyConfigurator;
    use crate::template::ObjectTemplate;
    use scope_abstractions::{Inject, Injected, ResolveExt};

    struct Menu;
    impl StatePolicy for Menu {}

    struct Lobby;
    impl StatePolicy for Lobby {
        fn persistent(&self) -> bool {
            true
        }
    }

    struct Fixture {
        world: Arc<World>,
        root: Arc<ScopeNode>,
        slot: Arc<ActiveStateSlot>,
    }

    impl Fixture {
        fn new() -> Self {
            let world = Arc::new(World::new());
            let root = ScopeNode::new_root("root", world.clone(), EmptyConfigurator);
            root.configure().unwrap();
            Self {
                world,
                root,
                slot: Arc::new(ActiveStateSlot::new()),
            }
        }

        fn attach(&self, name: &str, definition: StateDefinition) -> Arc<StateScope> {
            let owner = self.world.spawn_empty(name);
            StateScope::attach(
                &owner,
                Some(&self.root),
                &self.world,
                definition,
                self.slot.clone(),
                Arc::new(AsyncLifecycleDispatcher),
            )
        }

        fn activate(
            &self,
            name: &str,
            definition: StateDefinition,
        ) -> (Arc<StateScope>, StartOutcome) {
            let scope = self.attach(name, definition);
            scope.awake().unwrap();
            let outcome = scope.start().unwrap();
            (scope, outcome)
        }
    }

    #[test]
    fn starting_a_state_replaces_the_previous_one() {
        let fixture = Fixture::new();
        let (menu, _) = fixture.activate("menu", StateDefinition::new(Menu));
        assert!(fixture.slot.points_to(&menu));
        assert_eq!(fixture.root.children().len(), 1);

        let (lobby, outcome) = fixture.activate("lobby", StateDefinition::new(Lobby));
        assert_eq!(outcome, StartOutcome::Activated);
        assert_eq!(menu.state(), ScopeState::Destroyed);
        assert!(menu.owner().map_or(true, |owner| owner.is_destroyed()));
        assert!(Arc::ptr_eq(&fixture.slot.get().unwrap(), &lobby));
        assert_eq!(fixture.root.children().len(), 1, "旧状态已从父作用域脱离");
    }

    #[test]
    fn persistent_state_of_same_kind_rejects_newcomer() {
        let fixture = Fixture::new();
        let (first, _) = fixture.activate("lobby-1", StateDefinition::new(Lobby));
        assert!(first.owner().unwrap().is_persistent());

        let (second, outcome) = fixture.activate("lobby-2", StateDefinition::new(Lobby));
        assert_eq!(outcome, StartOutcome::Rejected);
        assert_eq!(second.state(), ScopeState::Destroyed);
        assert!(first.is_active());
        assert!(Arc::ptr_eq(&fixture.slot.get().unwrap(), &first));
    }

    #[test]
    fn non_persistent_teardown_clears_slot() {
        let fixture = Fixture::new();
        let (menu, _) = fixture.activate("menu", StateDefinition::new(Menu));
        menu.destroy_owner();
        assert!(fixture.slot.is_empty());
        assert!(!fixture.slot.points_to(&menu));
    }

    #[test]
    fn persistent_teardown_leaves_slot_untouched() {
        let fixture = Fixture::new();
        let (lobby, _) = fixture.activate("lobby", StateDefinition::new(Lobby));
        lobby.destroy_owner();
        assert!(fixture.slot.points_to(&lobby));
        assert!(fixture.slot.is_empty(), "已拆除的状态不再视为激活");
    }

    #[test]
    fn start_before_awake_is_rejected() {
        let fixture = Fixture::new();
        let scope = fixture.attach("menu", StateDefinition::new(Menu));
        assert!(matches!(
            scope.start().unwrap_err(),
            LifecycleError::InvalidState { .. }
        ));
    }

    struct Clock(u64);

    struct Timed {
        clock: Injected<Clock>,
    }

    impl StatePolicy for Arc<Timed> {
        fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
            self.clock.fill(resolver)
        }
    }

    #[test]
    fn awake_injects_policy_from_parent() {
        let world = Arc::new(World::new());
        let root = ScopeNode::new_root("root", world.clone(), |builder: &mut ContainerBuilder| {
            builder.register_instance(Arc::new(Clock(9)));
            Ok(())
        });
        root.configure().unwrap();

        let timed = Arc::new(Timed {
            clock: Injected::new(),
        });
        let owner = world.spawn_empty("timed");
        let scope = StateScope::attach(
            &owner,
            Some(&root),
            &world,
            StateDefinition::new(timed.clone()),
            Arc::new(ActiveStateSlot::new()),
            Arc::new(AsyncLifecycleDispatcher),
        );
        scope.awake().unwrap();
        assert_eq!(timed.clock.get().unwrap().0, 9);
        assert_eq!(scope.state(), ScopeState::Starting);
    }

    struct Score(u32);

    struct Hud {
        score: Injected<Score>,
    }

    impl Inject for Hud {
        fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
            self.score.fill(resolver)
        }
    }

    struct Gameplay;
    impl StatePolicy for Gameplay {
        fn configure(&self, builder: &mut ContainerBuilder) -> Result<(), DependencyError> {
            builder.register_instance(Arc::new(Score(3)));
            Ok(())
        }
    }

    #[test]
    fn inject_into_current_uses_active_state() {
        let fixture = Fixture::new();
        let hud = Arc::new(Hud {
            score: Injected::new(),
        });
        let target = SceneObject::new(
            "hud",
            vec![ComponentHandle::new(hud.clone()).with_capability::<dyn Inject>(hud.clone())],
        );

        assert!(!fixture.slot.inject_into_current(&target).unwrap());
        let (state, _) = fixture.activate("gameplay", StateDefinition::new(Gameplay));
        assert!(fixture.slot.inject_into_current(&target).unwrap());
        assert_eq!(hud.score.get().unwrap().0, 3);
        assert!(fixture.slot.current_scope().unwrap().can_resolve::<Score>());
        assert!(Arc::ptr_eq(&fixture.slot.current_scope().unwrap(), state.node()));
    }

    #[test]
    fn state_scoped_records_are_tracked_in_order() {
        #[derive(Debug)]
        struct Marker(&'static str);

        let record = |label: &'static str| {
            RegistrationRecord::new(Arc::new(
                ObjectTemplate::new(label)
                    .with_component(move || ComponentHandle::new(Arc::new(Marker(label)))),
            ))
            .expose::<Marker>()
        };
        let definition = StateDefinition::new(Menu)
            .with_component(record("A"))
            .with_component(record("B"));

        let fixture = Fixture::new();
        let (state, _) = fixture.activate("menu", definition);
        let labels: Vec<_> = state
            .registered_components()
            .iter()
            .filter_map(|component| component.capability::<Marker>())
            .map(|marker| marker.0)
            .collect();
        assert_eq!(labels, vec!["A", "B"]);

        let objects = state.node().instantiated_objects();
        state.destroy_owner();
        assert!(objects.iter().all(|object| object.is_destroyed()));
    }
}
