//! 应用配置
//!
//! 支持 TOML 和 JSON 两种格式，按文件扩展名选择解析器。
//!
//! ```toml
//! [root]
//! name = "Game"
//! dont_destroy_on_load = true
//!
//! [[root.components]]
//! template = "audio"
//! capabilities = ["Music"]
//!
//! [lifecycle]
//! mode = "async"
//!
//! [[states]]
//! name = "menu"
//! template = "states/menu"
//!
//! [logging]
//! level = "debug"
//! ```

use scope_abstractions::{StateDescriptor, TemplateRef};
use scope_impl::{CapabilityCatalog, RegistrationRecord, TemplateCatalog};
use serde::{Deserialize, Serialize};
use state_common::{ConfigError, ConfigResult, LifecycleMode};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub root: RootSettings,
    pub lifecycle: LifecycleSettings,
    pub states: Vec<StateSettings>,
    pub logging: LoggingSettings,
}

/// 根作用域配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootSettings {
    pub name: String,
    pub dont_destroy_on_load: bool,
    pub components: Vec<ComponentSettings>,
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            name: "Application".to_string(),
            dont_destroy_on_load: true,
            components: Vec::new(),
        }
    }
}

/// 一条注册记录的配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSettings {
    /// 模板键
    pub template: String,
    pub name: Option<String>,
    pub dont_destroy_on_load: bool,
    /// 能力名称，通过 [`CapabilityCatalog`] 解析
    pub capabilities: Vec<String>,
}

impl ComponentSettings {
    /// 转换为注册记录，模板键找不到时得到未指定模板的记录
    pub fn to_record(
        &self,
        templates: &TemplateCatalog,
        capabilities: &CapabilityCatalog,
    ) -> RegistrationRecord {
        let template = templates.get(&self.template);
        if template.is_none() && !self.template.trim().is_empty() {
            warn!("注册记录引用了不存在的模板: {}", self.template);
        }

        let mut record = RegistrationRecord::unassigned()
            .with_template(template)
            .dont_destroy_on_load(self.dont_destroy_on_load);
        if let Some(name) = &self.name {
            record = record.named(name.clone());
        }
        self.capabilities
            .iter()
            .fold(record, |record, name| {
                record.expose_type(capabilities.lookup(name))
            })
    }
}

/// 生命周期配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    pub mode: LifecycleMode,
}

/// 状态配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSettings {
    pub name: String,
    pub template: String,
}

impl StateSettings {
    pub fn descriptor(&self) -> StateDescriptor {
        StateDescriptor::new(self.name.clone(), TemplateRef::new(self.template.clone()))
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    pub show_target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            show_target: true,
        }
    }
}

impl AppSettings {
    /// 从文件加载，按扩展名选择 TOML 或 JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        debug!("加载配置文件: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })
    }

    /// 验证状态配置：名称不能为空或重复，模板键不能为空
    ///
    /// 根作用域注册记录不在这里检查，模板键为空或不存在的记录在注册时单独跳过。
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for state in &self.states {
            if state.name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "状态名称不能为空".to_string(),
                });
            }
            if !seen.insert(state.name.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!("状态名称重复: {}", state.name),
                });
            }
            if state.template.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("状态 {} 的模板键为空", state.name),
                });
            }
        }

        Ok(())
    }

    /// 按名称查找状态
    pub fn state(&self, name: &str) -> Option<&StateSettings> {
        self.states.iter().find(|state| state.name == name)
    }
}
