//! 对象模板、模板加载与实例化

use crate::object::SceneObject;
use crate::state::StateDefinition;
use async_trait::async_trait;
use dashmap::DashMap;
use scope_abstractions::{ResourceReclaimer, TemplateRef, TemplateResolver};
use state_common::ComponentHandle;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 组件工厂，每次实例化产生新的组件
pub type ComponentFactory = Arc<dyn Fn() -> ComponentHandle + Send + Sync>;

/// 对象模板
///
/// 每次实例化都会调用全部组件工厂，得到一组全新的组件。
/// 带有 [`StateDefinition`] 的模板实例化后会承载一个独占状态作用域。
#[derive(Clone)]
pub struct ObjectTemplate {
    name: String,
    components: Vec<ComponentFactory>,
    state: Option<StateDefinition>,
}

impl ObjectTemplate {
    /// 创建空模板
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            state: None,
        }
    }

    /// 添加组件工厂
    pub fn with_component<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ComponentHandle + Send + Sync + 'static,
    {
        self.components.push(Arc::new(factory));
        self
    }

    /// 声明该模板承载的状态
    pub fn with_state(mut self, definition: StateDefinition) -> Self {
        self.state = Some(definition);
        self
    }

    /// 模板名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 承载的状态定义
    pub fn state(&self) -> Option<&StateDefinition> {
        self.state.as_ref()
    }

    /// 组件数量
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn create_components(&self) -> Vec<ComponentHandle> {
        self.components.iter().map(|factory| factory()).collect()
    }
}

impl fmt::Debug for ObjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplate")
            .field("name", &self.name)
            .field("components", &self.components.len())
            .field("state", &self.state)
            .finish()
    }
}

/// 模板加载器
#[async_trait]
pub trait TemplateLoader: Send + Sync {
    /// 按资源路径加载模板，失败时返回 `None`
    async fn load_template(&self, path: &str) -> Option<Arc<ObjectTemplate>>;
}

/// 对象实例化器
#[async_trait]
pub trait Instantiator: Send + Sync {
    /// 实例化模板，失败时返回 `None`
    async fn instantiate(&self, template: &Arc<ObjectTemplate>) -> Option<Arc<SceneObject>>;
}

/// 内存模板目录
///
/// 同时充当模板路径解析器、加载器和资源回收器。
/// 加载过的模板进入常驻缓存，回收时逐出没有任何存活对象或注册记录引用的模板。
#[derive(Default)]
pub struct TemplateCatalog {
    paths: DashMap<String, String>,
    sources: DashMap<String, Arc<ObjectTemplate>>,
    resident: DashMap<String, Arc<ObjectTemplate>>,
    released: AtomicUsize,
}

impl TemplateCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加模板
    pub fn insert(
        &self,
        key: impl Into<String>,
        path: impl Into<String>,
        template: ObjectTemplate,
    ) -> Arc<ObjectTemplate> {
        let key = key.into();
        let path = path.into();
        let template = Arc::new(template);
        debug!("添加模板: {} -> {}", key, path);
        self.paths.insert(key, path.clone());
        self.sources.insert(path, template.clone());
        template
    }

    /// 按模板键获取模板
    pub fn get(&self, key: &str) -> Option<Arc<ObjectTemplate>> {
        let path = self.paths.get(key)?.value().clone();
        self.sources.get(&path).map(|entry| entry.value().clone())
    }

    /// 是否包含模板键
    pub fn contains_key(&self, key: &str) -> bool {
        self.paths.contains_key(key)
    }

    /// 模板是否常驻
    pub fn is_resident(&self, path: &str) -> bool {
        self.resident.contains_key(path)
    }

    /// 常驻模板数量
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// 累计回收的模板数量
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TemplateCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCatalog")
            .field("templates", &self.paths.len())
            .field("resident", &self.resident.len())
            .finish()
    }
}

impl TemplateResolver for TemplateCatalog {
    fn resolve_path(&self, template: &TemplateRef) -> Option<String> {
        if template.is_empty() {
            return None;
        }
        self.paths
            .get(template.key())
            .map(|entry| entry.value().clone())
            .filter(|path| !path.trim().is_empty())
    }
}

#[async_trait]
impl TemplateLoader for TemplateCatalog {
    async fn load_template(&self, path: &str) -> Option<Arc<ObjectTemplate>> {
        tokio::task::yield_now().await;
        let template = self.sources.get(path).map(|entry| entry.value().clone())?;
        self.resident.insert(path.to_string(), template.clone());
        Some(template)
    }
}

#[async_trait]
impl ResourceReclaimer for TemplateCatalog {
    async fn release_unused(&self) {
        tokio::task::yield_now().await;
        let before = self.resident.len();
        // 目录自身持有两份引用：源表和常驻缓存
        self.resident
            .retain(|_, template| Arc::strong_count(template) > 2);
        // 并发加载可能在期间插入新模板
        let evicted = before.saturating_sub(self.resident.len());
        self.released.fetch_add(evicted, Ordering::SeqCst);
        info!("回收未使用的模板: {} 个", evicted);
    }
}
