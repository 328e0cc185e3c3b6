//! 状态描述

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 对象模板的软引用
///
/// 只保存模板键，真正的模板由 [`crate::TemplateResolver`] 和加载器在切换时取得。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateRef {
    key: String,
}

impl TemplateRef {
    /// 创建模板引用
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// 模板键
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 是否为空引用
    pub fn is_empty(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// 状态描述
///
/// 引用一个状态对象模板，并携带任意类型的扩展数据。
#[derive(Clone)]
pub struct StateDescriptor {
    name: String,
    template: TemplateRef,
    extra_data: Vec<Arc<dyn Any + Send + Sync>>,
}

impl StateDescriptor {
    /// 创建状态描述
    pub fn new(name: impl Into<String>, template: TemplateRef) -> Self {
        Self {
            name: name.into(),
            template,
            extra_data: Vec::new(),
        }
    }

    /// 添加扩展数据
    pub fn with_extension<T: Send + Sync + 'static>(mut self, data: T) -> Self {
        self.extra_data.push(Arc::new(data));
        self
    }

    /// 状态名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 状态对象模板
    pub fn template(&self) -> &TemplateRef {
        &self.template
    }

    /// 扩展数据数量
    pub fn extension_count(&self) -> usize {
        self.extra_data.len()
    }

    /// 查找第一个指定类型的扩展数据
    pub fn try_get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extra_data
            .iter()
            .find_map(|data| data.downcast_ref::<T>())
    }
}

impl fmt::Debug for StateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDescriptor")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("extensions", &self.extra_data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct MusicTrack(&'static str);

    #[derive(Debug, PartialEq)]
    struct LoadingScreen {
        tips: bool,
    }

    #[test]
    fn extensions_are_found_by_type() {
        let descriptor = StateDescriptor::new("gameplay", TemplateRef::new("states/gameplay"))
            .with_extension(MusicTrack("battle"))
            .with_extension(LoadingScreen { tips: true });

        assert_eq!(descriptor.try_get_extension::<MusicTrack>(), Some(&MusicTrack("battle")));
        assert_eq!(
            descriptor.try_get_extension::<LoadingScreen>(),
            Some(&LoadingScreen { tips: true })
        );
        assert!(descriptor.try_get_extension::<String>().is_none());
        assert_eq!(descriptor.extension_count(), 2);
    }

    #[test]
    fn blank_template_reference_is_empty() {
        assert!(TemplateRef::new("  ").is_empty());
        assert!(!TemplateRef::new("menu").is_empty());
    }
}
