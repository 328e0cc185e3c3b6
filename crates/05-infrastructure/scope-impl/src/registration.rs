//! 组件注册记录
//!
//! 一条记录描述一个对象模板以及该对象上需要暴露给作用域的能力。
//! 每次注册都会从模板实例化一个新对象，并把匹配的组件注册到正在构建的作用域。

use crate::container::ContainerBuilder;
use crate::template::ObjectTemplate;
use scope_abstractions::Inject;
use state_common::{ComponentHandle, ConfigurationError, DependencyError, Lifetime, TypeInfo};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// 需要暴露的能力类型
///
/// 可以静态声明，也可以来自配置中的名称；名称无法解析时保持未解析状态，注册时跳过。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityType {
    name: String,
    type_info: Option<TypeInfo>,
}

impl CapabilityType {
    /// 静态声明能力
    pub fn of<T: ?Sized + 'static>() -> Self {
        let type_info = TypeInfo::of::<T>();
        Self {
            name: type_info.short_name().to_string(),
            type_info: Some(type_info),
        }
    }

    /// 无法解析的能力名称
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_info: None,
        }
    }

    /// 能力名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 解析后的类型
    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.as_ref()
    }

    /// 是否已解析
    pub fn is_valid(&self) -> bool {
        self.type_info.is_some()
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 能力名称目录，把配置中的能力名称映射到类型
#[derive(Debug, Default, Clone)]
pub struct CapabilityCatalog {
    types: HashMap<String, TypeInfo>,
}

impl CapabilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以名称登记能力类型
    pub fn register<T: ?Sized + 'static>(&mut self, name: impl Into<String>) -> &mut Self {
        self.types.insert(name.into(), TypeInfo::of::<T>());
        self
    }

    /// 按名称查找，找不到时返回未解析的能力
    pub fn lookup(&self, name: &str) -> CapabilityType {
        match self.types.get(name) {
            Some(type_info) => CapabilityType {
                name: name.to_string(),
                type_info: Some(type_info.clone()),
            },
            None => CapabilityType::unresolved(name),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// 注册记录
#[derive(Debug, Clone, Default)]
pub struct RegistrationRecord {
    name: Option<String>,
    template: Option<Arc<ObjectTemplate>>,
    dont_destroy_on_load: bool,
    capabilities: Vec<CapabilityType>,
}

impl RegistrationRecord {
    /// 以模板创建记录
    pub fn new(template: Arc<ObjectTemplate>) -> Self {
        Self::unassigned().with_template(Some(template))
    }

    /// 未指定模板的记录，注册时报告配置错误
    pub fn unassigned() -> Self {
        Self::default()
    }

    /// 设置模板
    pub fn with_template(mut self, template: Option<Arc<ObjectTemplate>>) -> Self {
        self.template = template;
        self
    }

    /// 设置显示名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 实例化的对象在状态切换中保留
    pub fn dont_destroy_on_load(mut self, enabled: bool) -> Self {
        self.dont_destroy_on_load = enabled;
        self
    }

    /// 暴露能力 `T`
    pub fn expose<T: ?Sized + 'static>(self) -> Self {
        self.expose_type(CapabilityType::of::<T>())
    }

    /// 暴露能力
    pub fn expose_type(mut self, capability: CapabilityType) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn template(&self) -> Option<&Arc<ObjectTemplate>> {
        self.template.as_ref()
    }

    pub fn capabilities(&self) -> &[CapabilityType] {
        &self.capabilities
    }

    pub fn is_persistent(&self) -> bool {
        self.dont_destroy_on_load
    }

    /// 用于日志和对象名的名称：记录名称优先，其次模板名称
    pub fn display_name(&self) -> String {
        match (&self.name, &self.template) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(template)) => template.name().to_string(),
            _ => "<unassigned>".to_string(),
        }
    }

    /// 执行注册，返回匹配到的组件（按声明顺序，去重）
    pub fn register(
        &self,
        builder: &mut ContainerBuilder,
    ) -> Result<Vec<Arc<ComponentHandle>>, ConfigurationError> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| ConfigurationError::UnassignedReference {
                record: self.display_name(),
            })?;

        let object = builder.instantiate(template);
        object.set_name(format!("[{}]", self.display_name()));
        if self.dont_destroy_on_load {
            object.set_persistent(true);
        }

        let mut registered: Vec<Arc<ComponentHandle>> = Vec::new();
        for capability in &self.capabilities {
            let Some(type_info) = capability.type_info().cloned() else {
                warn!(
                    "注册记录 {} 的能力类型无效，已跳过: {}",
                    self.display_name(),
                    capability
                );
                continue;
            };

            let Some(component) = object.find_component(type_info.id) else {
                debug!(
                    "对象 {} 上没有提供 {} 的组件",
                    object.name(),
                    type_info.short_name()
                );
                continue;
            };

            let provider = component.clone();
            let key = type_info.clone();
            builder.register_slot_factory(
                type_info.clone(),
                Lifetime::Singleton,
                move |resolver| {
                    if let Some(target) = provider.capability::<dyn Inject>() {
                        target.inject(resolver)?;
                    }
                    provider
                        .capability_slot(key.id)
                        .ok_or_else(|| DependencyError::TypeMismatch {
                            type_name: key.name.clone(),
                        })
                },
            );

            // 构建完成后立即解析一次，组件的注入在已知时机发生
            let touch = type_info.clone();
            builder.register_build_callback(move |resolver| {
                resolver.resolve_slot(&touch).map(|_| ())
            });

            debug!(
                "注册组件 {} 为 {} (作用域 {})",
                component.name(),
                type_info.short_name(),
                builder.scope().name
            );
            if !registered.iter().any(|existing| Arc::ptr_eq(existing, &component)) {
                registered.push(component);
            }
        }
        Ok(registered)
    }
}

/// 依次注册多条记录，出错的记录记录日志后跳过
pub fn register_records(
    builder: &mut ContainerBuilder,
    records: &[RegistrationRecord],
) -> Vec<Arc<ComponentHandle>> {
    let mut registered = Vec::new();
    for record in records {
        match record.register(builder) {
            Ok(components) => registered.extend(components),
            Err(err @ ConfigurationError::InvalidCapability { .. }) => {
                warn!("跳过注册记录 {}: {}", record.display_name(), err);
            }
            Err(err) => {
                error!("跳过注册记录 {}: {}", record.display_name(), err);
            }
        }
    }
    registered
}
