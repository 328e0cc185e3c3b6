//! 跨 crate 集成测试：根作用域 + 状态作用域 + 状态切换控制器

use async_trait::async_trait;
use parking_lot::Mutex;
use scope_abstractions::{
    AsyncStartable, HookResult, Inject, Injected, RegisteredComponentAsync, Resolve, ResolveExt,
    StateDescriptor, StateObserver, TemplateRef,
};
use scope_impl::{
    EntryPointType, GlobalData, ObjectTemplate, RegistrationRecord, StateDefinition, StatePolicy,
};
use state_common::{ComponentHandle, DependencyError, TransitionError};
use state_composition::{ApplicationBuilder, StateApplication};
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

/// 全局配置
#[derive(Debug)]
struct GameConfig {
    title: String,
}

/// 关卡难度，挂在状态描述上
#[derive(Debug, Clone, Copy, PartialEq)]
struct Difficulty(u8);

trait Music: Send + Sync {
    fn track(&self) -> &str;
}

struct Jukebox;

impl Music for Jukebox {
    fn track(&self) -> &str {
        "theme"
    }
}

/// 启动入口
struct Boot {
    journal: Journal,
}

#[async_trait]
impl AsyncStartable for Boot {
    async fn start_async(&self) -> HookResult {
        self.journal.lock().push("boot".to_string());
        Ok(())
    }
}

/// 状态内的 HUD，依赖根作用域的全局配置
struct Hud {
    config: Injected<GameConfig>,
    journal: Journal,
}

impl Inject for Hud {
    fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
        self.config.fill(resolver)
    }
}

#[async_trait]
impl RegisteredComponentAsync for Hud {
    async fn on_create_async(&self) -> HookResult {
        let title = self
            .config
            .get()
            .map(|config| config.title.clone())
            .ok_or("HUD 未注入")?;
        self.journal.lock().push(format!("hud:{}", title));
        Ok(())
    }

    async fn on_destroy_async(&self) -> HookResult {
        self.journal.lock().push("hud:gone".to_string());
        Ok(())
    }
}

struct MenuState;
impl StatePolicy for MenuState {}

/// 竞技场状态，构建时从父作用域取音乐
struct ArenaState {
    music: Arc<Injected<dyn Music>>,
}

impl StatePolicy for ArenaState {
    fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
        self.music.fill(resolver)
    }
}

/// 记录通知和描述扩展数据
struct Recorder {
    journal: Journal,
}

#[async_trait]
impl StateObserver for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn on_state_loaded(&self, descriptor: &StateDescriptor) -> HookResult {
        let entry = match descriptor.try_get_extension::<Difficulty>() {
            Some(Difficulty(level)) => format!("loaded:{}@{}", descriptor.name(), level),
            None => format!("loaded:{}", descriptor.name()),
        };
        self.journal.lock().push(entry);
        Ok(())
    }

    async fn on_state_unloaded(&self, descriptor: &StateDescriptor) -> HookResult {
        self.journal.lock().push(format!("unloaded:{}", descriptor.name()));
        Ok(())
    }
}

struct Fixture {
    app: StateApplication,
    journal: Journal,
    arena_music: Arc<Injected<dyn Music>>,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let arena_music = Arc::new(Injected::new());

    let hud_journal = journal.clone();
    let hud = ObjectTemplate::new("hud").with_component(move || {
        let hud = Arc::new(Hud {
            config: Injected::new(),
            journal: hud_journal.clone(),
        });
        ComponentHandle::new(hud.clone())
            .with_capability::<dyn Inject>(hud.clone())
            .with_capability::<dyn RegisteredComponentAsync>(hud)
    });
    let menu = StateDefinition::new(MenuState)
        .with_component(RegistrationRecord::new(Arc::new(hud)).expose::<Hud>());
    let arena = StateDefinition::new(ArenaState {
        music: arena_music.clone(),
    });

    let jukebox = ObjectTemplate::new("jukebox").with_component(|| {
        let jukebox = Arc::new(Jukebox);
        ComponentHandle::new(jukebox.clone()).with_capability::<dyn Music>(jukebox)
    });

    let jukebox = Arc::new(jukebox);
    let boot_journal = journal.clone();
    let app = ApplicationBuilder::new()
        .with_template("menu", "states/menu", ObjectTemplate::new("menu").with_state(menu))
        .with_template("arena", "states/arena", ObjectTemplate::new("arena").with_state(arena))
        .with_component(
            RegistrationRecord::unassigned()
                .named("silent")
                .expose::<dyn Music>(),
        )
        .with_component(RegistrationRecord::new(jukebox).expose::<dyn Music>())
        .with_global_data(GlobalData::new(GameConfig {
            title: "Lorn".to_string(),
        }))
        .with_entry_point(
            EntryPointType::new(move |_| {
                Ok(Arc::new(Boot {
                    journal: boot_journal.clone(),
                }))
            })
            .async_startable()
            .build(),
        )
        .with_state(StateDescriptor::new("menu", TemplateRef::new("menu")))
        .with_state(
            StateDescriptor::new("arena", TemplateRef::new("arena")).with_extension(Difficulty(3)),
        )
        .with_observer(Arc::new(Recorder {
            journal: journal.clone(),
        }))
        .build()
        .await?;

    Ok(Fixture {
        app,
        journal,
        arena_music,
    })
}

fn journal(fixture: &Fixture) -> Vec<String> {
    fixture.journal.lock().clone()
}

#[tokio::test]
async fn test_entry_point_runs_once_at_startup() {
    let fixture = fixture().await.unwrap();
    assert_eq!(journal(&fixture), vec!["boot"]);
    assert!(fixture.app.root().object().is_persistent());
    // 未指定模板的记录被跳过，不影响后面的记录
    assert_eq!(fixture.app.root().registered_components().len(), 1);
    let music = fixture.app.root().node().resolve::<dyn Music>().unwrap();
    assert_eq!(music.track(), "theme");
}

#[tokio::test]
async fn test_state_components_see_root_services() {
    let fixture = fixture().await.unwrap();

    fixture.app.load_state("menu").await.unwrap();

    assert_eq!(journal(&fixture), vec!["boot", "hud:Lorn", "loaded:menu"]);
    let scope = fixture.app.active_state().unwrap();
    assert!(scope.node().resolve::<Hud>().is_ok());
    assert!(!fixture.app.root().node().can_resolve::<Hud>());
}

#[tokio::test]
async fn test_menu_then_arena_scenario() {
    let fixture = fixture().await.unwrap();

    let menu = fixture.app.load_state("menu").await.unwrap();
    let menu = menu.object().cloned().unwrap();
    fixture.app.load_state("arena").await.unwrap();

    assert!(menu.is_destroyed());
    assert_eq!(
        journal(&fixture),
        vec![
            "boot",
            "hud:Lorn",
            "loaded:menu",
            "hud:gone",
            "unloaded:menu",
            "loaded:arena@3",
        ]
    );
    let active = fixture.app.active_state().unwrap();
    assert_eq!(active.owner().unwrap().name(), "[arena]");
}

#[tokio::test]
async fn test_state_policy_resolves_from_parent() {
    let fixture = fixture().await.unwrap();
    assert!(!fixture.arena_music.is_filled());

    fixture.app.load_state("arena").await.unwrap();

    let music = fixture.arena_music.get().unwrap();
    assert_eq!(music.track(), "theme");
    let scope = fixture.app.active_state().unwrap();
    assert!(scope.node().can_resolve::<dyn Music>());
    assert!(!scope.node().is_registered_locally(std::any::TypeId::of::<dyn Music>()));
}

#[tokio::test]
async fn test_concurrent_loads_admit_exactly_one() {
    let fixture = fixture().await.unwrap();

    let results = futures::future::join_all(
        ["menu", "arena", "menu"]
            .into_iter()
            .map(|name| fixture.app.load_state(name)),
    )
    .await;

    let accepted = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(TransitionError::LoadInProgress)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 2);
    assert!(fixture.app.active_state().is_some());
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let fixture = fixture().await.unwrap();
    fixture.app.load_state("menu").await.unwrap();

    fixture.app.shutdown();

    assert!(fixture.app.active_state().is_none());
    assert!(fixture.app.root().node().is_disposed());
    assert_eq!(fixture.app.world().live_count(), 0);
}
