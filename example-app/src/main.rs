//! # 状态切换演示程序
//!
//! 按命令行给出的顺序加载状态，最后打印完整的切换记录。
//!
//! ```text
//! state-demo --config config/demo.toml --state menu --state gameplay --state lobby
//! ```

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use scope_abstractions::{
    GameStateAsync, HookResult, Inject, Injected, RegisteredComponentAsync, Resolve, ResolveExt,
    StateDescriptor, StateObserver, Startable, TemplateRef,
};
use scope_impl::{
    EntryPointType, GlobalData, ObjectTemplate, RegistrationRecord, StateDefinition, StatePolicy,
};
use state_common::{ComponentHandle, DependencyError};
use state_composition::{AppSettings, ApplicationBuilder, LoggingConfig, StateApplication};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "state-demo")]
#[command(about = "独占状态切换演示")]
struct Args {
    /// 配置文件路径（TOML 或 JSON）
    #[arg(short, long, default_value = "config/demo.toml")]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long)]
    log_level: Option<String>,

    /// 依次加载的状态，可重复
    #[arg(short, long = "state")]
    states: Vec<String>,
}

type Journal = Arc<Mutex<Vec<String>>>;

/// 演示用的全局数据
#[derive(Debug)]
struct DemoInfo {
    title: String,
}

trait Music: Send + Sync {
    fn play(&self, track: &str) -> String;
}

struct Jukebox;

impl Music for Jukebox {
    fn play(&self, track: &str) -> String {
        format!("♪ {}", track)
    }
}

/// 根作用域构建完成后打招呼
struct Greeter {
    info: Arc<DemoInfo>,
}

impl Startable for Greeter {
    fn start(&self) {
        info!("欢迎来到 {}", self.info.title);
    }
}

/// 游戏状态内的记分板，创建时播放战斗音乐
struct Scoreboard {
    music: Injected<dyn Music>,
    journal: Journal,
}

impl Inject for Scoreboard {
    fn inject(&self, resolver: &dyn Resolve) -> Result<(), DependencyError> {
        self.music.fill(resolver)
    }
}

#[async_trait]
impl RegisteredComponentAsync for Scoreboard {
    async fn on_create_async(&self) -> HookResult {
        let music = self.music.get().ok_or("记分板缺少音乐")?;
        self.journal
            .lock()
            .push(format!("  scoreboard 创建 {}", music.play("battle")));
        Ok(())
    }

    async fn on_destroy_async(&self) -> HookResult {
        self.journal.lock().push("  scoreboard 销毁".to_string());
        Ok(())
    }
}

/// 挂在每个状态对象上的横幅
struct Banner {
    state: &'static str,
    journal: Journal,
}

#[async_trait]
impl GameStateAsync for Banner {
    async fn load_async(&self) -> HookResult {
        self.journal.lock().push(format!("  {} load_async", self.state));
        Ok(())
    }

    async fn unload_async(&self) -> HookResult {
        self.journal
            .lock()
            .push(format!("  {} unload_async", self.state));
        Ok(())
    }
}

/// 把状态切换通知写入记录
struct TransitionLog {
    journal: Journal,
}

#[async_trait]
impl StateObserver for TransitionLog {
    fn name(&self) -> &str {
        "transition-log"
    }

    fn on_begin_load(&self, descriptor: &StateDescriptor) {
        self.journal
            .lock()
            .push(format!("开始加载 {}", descriptor.name()));
    }

    async fn on_state_loaded(&self, descriptor: &StateDescriptor) -> HookResult {
        self.journal
            .lock()
            .push(format!("已加载 {}", descriptor.name()));
        Ok(())
    }

    async fn on_state_unloaded(&self, descriptor: &StateDescriptor) -> HookResult {
        self.journal
            .lock()
            .push(format!("已卸载 {}", descriptor.name()));
        Ok(())
    }
}

struct TitleState;
impl StatePolicy for TitleState {}

struct MenuState;
impl StatePolicy for MenuState {}

struct GameplayState;
impl StatePolicy for GameplayState {}

/// 大厅在切换之间保留
struct LobbyState;
impl StatePolicy for LobbyState {
    fn persistent(&self) -> bool {
        true
    }
}

const DEFAULT_STATES: [&str; 4] = ["title", "menu", "gameplay", "lobby"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = load_settings(&args)?;
    let mut logging = LoggingConfig::from_settings(&settings.logging);
    if let Some(level) = &args.log_level {
        logging = logging.with_level(
            level
                .parse()
                .with_context(|| format!("无法识别的日志级别: {}", level))?,
        );
    }

    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let app = build_application(settings, logging, &journal).await?;

    let sequence: Vec<String> = if args.states.is_empty() {
        DEFAULT_STATES.iter().map(|name| name.to_string()).collect()
    } else {
        args.states.clone()
    };

    for name in &sequence {
        match app.load_state(name).await {
            Ok(outcome) if outcome.is_deduplicated() => {
                journal.lock().push(format!("{} 已在运行，沿用现有实例", name));
            }
            Ok(_) => {}
            Err(err) => {
                warn!("加载状态 {} 失败: {}", name, err);
                journal.lock().push(format!("加载 {} 失败: {}", name, err));
            }
        }
    }

    if let Some(state) = app.active_state() {
        info!("当前激活状态: {}", state.name());
    }
    app.shutdown();

    println!("状态切换记录:");
    for line in journal.lock().iter() {
        println!("{}", line);
    }
    Ok(())
}

/// 读取配置文件，文件不存在时使用默认配置
fn load_settings(args: &Args) -> anyhow::Result<AppSettings> {
    if !args.config.exists() {
        return Ok(AppSettings::default());
    }
    let settings = AppSettings::from_file(&args.config)
        .with_context(|| format!("加载配置文件失败: {}", args.config.display()))?;
    if settings.states.is_empty() {
        bail!("配置文件 {} 没有声明任何状态", args.config.display());
    }
    Ok(settings)
}

/// 组装演示应用
async fn build_application(
    settings: AppSettings,
    logging: LoggingConfig,
    journal: &Journal,
) -> anyhow::Result<StateApplication> {
    let from_file = !settings.states.is_empty();

    let mut builder = ApplicationBuilder::new()
        .with_logging(logging)
        .with_capability::<dyn Music>("Music")
        .with_template("jukebox", "prefabs/jukebox", jukebox_template())
        .with_template(
            "title",
            "states/title",
            state_template("title", StateDefinition::new(TitleState), journal),
        )
        .with_template(
            "menu",
            "states/menu",
            state_template("menu", StateDefinition::new(MenuState), journal),
        )
        .with_template(
            "gameplay",
            "states/gameplay",
            state_template("gameplay", gameplay_definition(journal), journal),
        )
        .with_template(
            "lobby",
            "states/lobby",
            state_template("lobby", StateDefinition::new(LobbyState), journal),
        )
        .with_global_data(GlobalData::new(DemoInfo {
            title: settings.root.name.clone(),
        }))
        .with_entry_point(
            EntryPointType::new(|resolver| {
                let info = resolver.resolve::<DemoInfo>()?;
                Ok(Arc::new(Greeter { info }))
            })
            .startable()
            .build(),
        )
        .with_observer(Arc::new(TransitionLog {
            journal: journal.clone(),
        }));

    if !from_file {
        builder = builder.with_component(
            RegistrationRecord::new(Arc::new(jukebox_template())).expose::<dyn Music>(),
        );
        for name in DEFAULT_STATES {
            builder = builder.with_state(StateDescriptor::new(name, TemplateRef::new(name)));
        }
    }

    let app = builder
        .with_settings(settings)
        .build()
        .await
        .context("构建应用失败")?;
    Ok(app)
}

fn jukebox_template() -> ObjectTemplate {
    ObjectTemplate::new("jukebox").with_component(|| {
        let jukebox = Arc::new(Jukebox);
        ComponentHandle::new(jukebox.clone()).with_capability::<dyn Music>(jukebox)
    })
}

fn gameplay_definition(journal: &Journal) -> StateDefinition {
    let journal = journal.clone();
    let scoreboard = ObjectTemplate::new("scoreboard").with_component(move || {
        let scoreboard = Arc::new(Scoreboard {
            music: Injected::new(),
            journal: journal.clone(),
        });
        ComponentHandle::new(scoreboard.clone())
            .with_capability::<dyn Inject>(scoreboard.clone())
            .with_capability::<dyn RegisteredComponentAsync>(scoreboard)
    });
    StateDefinition::new(GameplayState)
        .with_component(RegistrationRecord::new(Arc::new(scoreboard)).expose::<Scoreboard>())
}

fn state_template(
    name: &'static str,
    definition: StateDefinition,
    journal: &Journal,
) -> ObjectTemplate {
    let journal = journal.clone();
    ObjectTemplate::new(name)
        .with_component(move || {
            let banner = Arc::new(Banner {
                state: name,
                journal: journal.clone(),
            });
            ComponentHandle::new(banner.clone()).with_capability::<dyn GameStateAsync>(banner)
        })
        .with_state(definition)
}
