//! 错误类型定义

use thiserror::Error;

/// 配置文件错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 注册配置错误
///
/// 只影响出错的那条注册记录，其余记录照常注册。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("注册记录 {record} 未指定对象模板")]
    UnassignedReference { record: String },

    #[error("能力类型无效: {name}")]
    InvalidCapability { name: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("组件创建失败: {type_name}, 原因: {message}")]
    ComponentCreationFailed { type_name: String, message: String },

    #[error("组件类型不匹配: {type_name}")]
    TypeMismatch { type_name: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("作用域已释放: {scope}")]
    ScopeDisposed { scope: String },
}

impl DependencyError {
    /// 创建未注册错误
    pub fn not_registered(type_name: impl Into<String>) -> Self {
        Self::ComponentNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// 作用域错误类型
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("作用域重复配置: {scope}")]
    AlreadyConfigured { scope: String },

    #[error("作用域已释放: {scope}")]
    Disposed { scope: String },

    #[error("作用域构建失败: {source}")]
    Dependency {
        #[from]
        source: DependencyError,
    },
}

/// 生命周期钩子错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("生命周期钩子失败: {component}.{hook}, 原因: {message}")]
    HookFailed {
        component: String,
        hook: &'static str,
        message: String,
    },

    #[error("入口点启动失败: {entry_point}, 原因: {message}")]
    EntryPointFailed { entry_point: String, message: String },

    #[error("状态作用域处于错误的生命周期阶段: 期望 {expected}, 实际 {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("状态作用域初始化失败: {source}")]
    Scope {
        #[from]
        source: ScopeError,
    },
}

impl LifecycleError {
    /// 创建钩子失败错误
    pub fn hook_failed(
        component: impl Into<String>,
        hook: &'static str,
        error: &(dyn std::error::Error + Send + Sync),
    ) -> Self {
        Self::HookFailed {
            component: component.into(),
            hook,
            message: error.to_string(),
        }
    }
}

/// 状态切换错误类型
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("已有状态正在加载")]
    LoadInProgress,

    #[error("已有状态正在卸载")]
    UnloadInProgress,

    #[error("状态描述不存在: {name}")]
    MissingDescriptor { name: String },

    #[error("无法解析对象模板路径: {template}")]
    UnresolvedTemplatePath { template: String },

    #[error("对象模板加载失败: {path}")]
    TemplateLoadFailed { path: String },

    #[error("对象模板实例化失败: {template}")]
    InstantiationFailed { template: String },

    #[error("状态生命周期钩子失败: {source}")]
    Hook {
        #[from]
        source: LifecycleError,
    },

    #[error("状态观察者 {observer} 失败: {message}")]
    Observer { observer: String, message: String },
}

impl TransitionError {
    /// 是否为重入拒绝
    pub fn is_reentrancy_rejected(&self) -> bool {
        matches!(self, Self::LoadInProgress | Self::UnloadInProgress)
    }

    /// 是否为模板解析或实例化失败
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedTemplatePath { .. }
                | Self::TemplateLoadFailed { .. }
                | Self::InstantiationFailed { .. }
        )
    }
}

/// 应用层错误类型
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("注册配置错误: {source}")]
    Configuration {
        #[from]
        source: ConfigurationError,
    },

    #[error("依赖注入错误: {source}")]
    Dependency {
        #[from]
        source: DependencyError,
    },

    #[error("作用域错误: {source}")]
    Scope {
        #[from]
        source: ScopeError,
    },

    #[error("生命周期错误: {source}")]
    Lifecycle {
        #[from]
        source: LifecycleError,
    },

    #[error("状态切换错误: {source}")]
    Transition {
        #[from]
        source: TransitionError,
    },

    #[error("应用启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ScopeResult<T> = Result<T, ScopeError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type TransitionResult<T> = Result<T, TransitionError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
