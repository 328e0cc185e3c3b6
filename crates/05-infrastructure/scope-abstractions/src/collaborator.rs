//! 状态切换的外部协作方

use crate::descriptor::TemplateRef;
use async_trait::async_trait;

/// 模板路径解析器
pub trait TemplateResolver: Send + Sync {
    /// 解析模板引用对应的资源路径，无法解析时返回 `None`
    fn resolve_path(&self, template: &TemplateRef) -> Option<String>;
}

/// 资源回收器
#[async_trait]
pub trait ResourceReclaimer: Send + Sync {
    /// 释放不再使用的资源，每个卸载周期调用一次
    async fn release_unused(&self);
}
