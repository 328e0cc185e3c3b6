//! 应用构建器

use crate::application::StateApplication;
use crate::controller::{Collaborators, StateTransitionController};
use crate::settings::{AppSettings, LoggingSettings};
use scope_abstractions::{ResourceReclaimer, StateDescriptor, StateObserver};
use scope_impl::{
    dispatcher_for, ActiveStateSlot, CapabilityCatalog, EntryPointType, GlobalData,
    ObjectTemplate, RegistrationRecord, RootScope, RootScopeConfig, StateHost, TemplateCatalog,
    World,
};
use state_common::{ApplicationError, ConfigError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 应用构建器
///
/// 使用建造者模式组装根作用域、状态宿主和状态切换控制器
pub struct ApplicationBuilder {
    /// 应用配置
    settings: AppSettings,
    /// 模板目录
    templates: Arc<TemplateCatalog>,
    /// 能力名称目录
    capabilities: CapabilityCatalog,
    /// 代码中声明的根作用域注册记录
    components: Vec<RegistrationRecord>,
    /// 全局数据
    global_data: Vec<GlobalData>,
    /// 入口点
    entry_point: Option<EntryPointType>,
    /// 代码中声明的状态
    states: Vec<StateDescriptor>,
    /// 状态切换观察者
    observers: Vec<Arc<dyn StateObserver>>,
    /// 资源回收器，默认由模板目录承担
    reclaimer: Option<Arc<dyn ResourceReclaimer>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new() -> Self {
        Self {
            settings: AppSettings::default(),
            templates: Arc::new(TemplateCatalog::new()),
            capabilities: CapabilityCatalog::new(),
            components: Vec::new(),
            global_data: Vec::new(),
            entry_point: None,
            states: Vec::new(),
            observers: Vec::new(),
            reclaimer: None,
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 使用已加载的配置
    pub fn with_settings(mut self, settings: AppSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从 TOML 或 JSON 文件加载配置
    pub fn with_settings_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("加载配置文件: {}", path.display());
        let settings = AppSettings::from_file(path)?;
        Ok(self.with_settings(settings))
    }

    /// 添加模板
    pub fn with_template(
        self,
        key: impl Into<String>,
        path: impl Into<String>,
        template: ObjectTemplate,
    ) -> Self {
        self.templates.insert(key, path, template);
        self
    }

    /// 使用外部模板目录
    pub fn with_templates(mut self, templates: Arc<TemplateCatalog>) -> Self {
        self.templates = templates;
        self
    }

    /// 以名称登记能力类型，供配置中的注册记录引用
    pub fn with_capability<T: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        self.capabilities.register::<T>(name);
        self
    }

    /// 添加根作用域注册记录
    pub fn with_component(mut self, record: RegistrationRecord) -> Self {
        self.components.push(record);
        self
    }

    /// 添加全局数据
    pub fn with_global_data(mut self, data: GlobalData) -> Self {
        self.global_data.push(data);
        self
    }

    /// 设置入口点
    pub fn with_entry_point(mut self, entry_point: EntryPointType) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    /// 添加状态
    pub fn with_state(mut self, descriptor: StateDescriptor) -> Self {
        self.states.push(descriptor);
        self
    }

    /// 订阅状态切换通知
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// 替换资源回收器
    pub fn with_reclaimer(mut self, reclaimer: Arc<dyn ResourceReclaimer>) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    /// 设置日志配置
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建应用实例
    pub async fn build(self) -> Result<StateApplication, ApplicationError> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.logging_config.try_init()?;
        }

        info!("开始构建应用");
        self.settings.validate()?;

        let world = Arc::new(World::new());

        let mut root_config = RootScopeConfig::new(self.settings.root.name.clone())
            .dont_destroy_on_load(self.settings.root.dont_destroy_on_load);
        root_config.components = self.components;
        root_config.components.extend(
            self.settings
                .root
                .components
                .iter()
                .map(|component| component.to_record(&self.templates, &self.capabilities)),
        );
        root_config.global_data = self.global_data;
        root_config.entry_point = self.entry_point;
        debug!("根作用域注册记录: {} 条", root_config.components.len());

        let root = RootScope::new(world.clone(), root_config);
        root.awake().await?;

        let slot = Arc::new(ActiveStateSlot::new());
        let host = Arc::new(StateHost::new(
            world.clone(),
            root.node().clone(),
            slot.clone(),
            dispatcher_for(self.settings.lifecycle.mode),
        ));

        let reclaimer = self
            .reclaimer
            .unwrap_or_else(|| self.templates.clone() as Arc<dyn ResourceReclaimer>);
        let collaborators = Collaborators {
            resolver: self.templates.clone(),
            loader: self.templates.clone(),
            instantiator: host.clone(),
            reclaimer,
        };
        let controller = StateTransitionController::new(collaborators, slot);
        for observer in self.observers {
            controller.subscribe(observer);
        }

        let mut states: Vec<StateDescriptor> = self
            .settings
            .states
            .iter()
            .map(|state| state.descriptor())
            .collect();
        states.extend(self.states);

        info!("应用构建完成，可用状态 {} 个", states.len());
        Ok(StateApplication::new(
            world,
            root,
            host,
            controller,
            self.templates,
            states,
        ))
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 从配置文件的日志段创建，无法识别的级别按 INFO 处理
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let level = settings.level.parse().unwrap_or(tracing::Level::INFO);
        Self {
            level,
            show_target: settings.show_target,
            json_format: settings.json,
            ..Self::default()
        }
    }

    /// 设置日志级别
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// 初始化日志系统，`RUST_LOG` 优先于配置的级别
    pub fn try_init(&self) -> Result<(), ApplicationError> {
        let default_level = self.level.to_string().to_lowercase();
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| ApplicationError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
