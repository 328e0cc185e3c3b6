//! 组合层测试
//!
//! 共享的测试状态、组件和观察者。


use crate::{ApplicationBuilder, StateApplication};
use async_trait::async_trait;
use parking_lot::Mutex;
use scope_abstractions::{
    GameStateAsync, HookResult, RegisteredComponentAsync, StateDescriptor, StateObserver,
    TemplateRef,
};
use scope_impl::{ObjectTemplate, RegistrationRecord, StateDefinition, StatePolicy};
use state_common::ComponentHandle;
use std::sync::Arc;

/// 按发生顺序记录事件
pub(crate) type EventLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn events(log: &EventLog) -> Vec<String> {
    log.lock().clone()
}

pub(crate) struct MenuState;
impl StatePolicy for MenuState {}

pub(crate) struct GameplayState;
impl StatePolicy for GameplayState {}

pub(crate) struct LobbyState;
impl StatePolicy for LobbyState {
    fn persistent(&self) -> bool {
        true
    }
}

/// 状态作用域内注册的组件
pub(crate) struct Tracker {
    label: &'static str,
    log: EventLog,
}

#[async_trait]
impl RegisteredComponentAsync for Tracker {
    async fn on_create_async(&self) -> HookResult {
        tokio::task::yield_now().await;
        self.log.lock().push(format!("create:{}", self.label));
        Ok(())
    }

    async fn on_destroy_async(&self) -> HookResult {
        self.log.lock().push(format!("destroy:{}", self.label));
        Ok(())
    }
}

pub(crate) fn tracker_record(label: &'static str, log: &EventLog) -> RegistrationRecord {
    let log = log.clone();
    let template = ObjectTemplate::new(label).with_component(move || {
        let tracker = Arc::new(Tracker {
            label,
            log: log.clone(),
        });
        ComponentHandle::new(tracker.clone())
            .with_capability::<dyn RegisteredComponentAsync>(tracker)
    });
    RegistrationRecord::new(Arc::new(template)).expose::<Tracker>()
}

/// 挂在状态对象上的加载/卸载钩子
pub(crate) struct StateHooks {
    name: &'static str,
    log: EventLog,
    fail_unload: bool,
}

#[async_trait]
impl GameStateAsync for StateHooks {
    async fn load_async(&self) -> HookResult {
        tokio::task::yield_now().await;
        self.log.lock().push(format!("load:{}", self.name));
        Ok(())
    }

    async fn unload_async(&self) -> HookResult {
        if self.fail_unload {
            return Err(format!("{} 拒绝卸载", self.name).into());
        }
        self.log.lock().push(format!("unload:{}", self.name));
        Ok(())
    }
}

/// 构建带钩子和状态定义的模板
pub(crate) fn state_template(
    name: &'static str,
    definition: StateDefinition,
    log: &EventLog,
    fail_unload: bool,
) -> ObjectTemplate {
    let log = log.clone();
    ObjectTemplate::new(name)
        .with_component(move || {
            let hooks = Arc::new(StateHooks {
                name,
                log: log.clone(),
                fail_unload,
            });
            ComponentHandle::new(hooks.clone()).with_capability::<dyn GameStateAsync>(hooks)
        })
        .with_state(definition)
}

/// 记录所有通知的观察者
pub(crate) struct RecordingObserver {
    log: EventLog,
}

impl RecordingObserver {
    pub(crate) fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self { log: log.clone() })
    }
}

#[async_trait]
impl StateObserver for RecordingObserver {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_begin_load(&self, descriptor: &StateDescriptor) {
        self.log.lock().push(format!("begin:{}", descriptor.name()));
    }

    async fn on_state_loaded(&self, descriptor: &StateDescriptor) -> HookResult {
        self.log.lock().push(format!("loaded:{}", descriptor.name()));
        Ok(())
    }

    async fn on_state_unloaded(&self, descriptor: &StateDescriptor) -> HookResult {
        self.log.lock().push(format!("unloaded:{}", descriptor.name()));
        Ok(())
    }
}

/// menu（组件 A、B、C）、gameplay、lobby（持久）、stubborn（卸载失败）四个状态的构建器
pub(crate) fn standard_builder(log: &EventLog) -> ApplicationBuilder {
    let menu = StateDefinition::new(MenuState)
        .with_component(tracker_record("A", log))
        .with_component(tracker_record("B", log))
        .with_component(tracker_record("C", log));

    ApplicationBuilder::new()
        .with_template("menu", "states/menu", state_template("menu", menu, log, false))
        .with_template(
            "gameplay",
            "states/gameplay",
            state_template("gameplay", StateDefinition::new(GameplayState), log, false),
        )
        .with_template(
            "lobby",
            "states/lobby",
            state_template("lobby", StateDefinition::new(LobbyState), log, false),
        )
        .with_template(
            "stubborn",
            "states/stubborn",
            state_template("stubborn", StateDefinition::new(GameplayState), log, true),
        )
        .with_state(StateDescriptor::new("menu", TemplateRef::new("menu")))
        .with_state(StateDescriptor::new("gameplay", TemplateRef::new("gameplay")))
        .with_state(StateDescriptor::new("lobby", TemplateRef::new("lobby")))
        .with_state(StateDescriptor::new("stubborn", TemplateRef::new("stubborn")))
        .with_observer(RecordingObserver::new(log))
}

pub(crate) async fn standard_app(log: &EventLog) -> StateApplication {
    standard_builder(log).build().await.unwrap()
}

/// 世界中处于激活状态的状态作用域数量
pub(crate) fn active_state_count(app: &StateApplication) -> usize {
    app.world()
        .live_objects()
        .iter()
        .filter_map(|object| object.state_scope())
        .filter(|scope| scope.is_active())
        .count()
}
