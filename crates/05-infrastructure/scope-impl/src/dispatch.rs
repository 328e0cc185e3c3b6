//! 组件异步生命周期分发
//!
//! 由配置中的 [`LifecycleMode`] 选择实现：异步模式按注册顺序等待每个钩子，
//! 同步模式不调用任何钩子。

use async_trait::async_trait;
use scope_abstractions::RegisteredComponentAsync;
use state_common::{ComponentHandle, LifecycleError, LifecycleMode};
use std::sync::Arc;
use tracing::debug;

/// 组件生命周期分发器
#[async_trait]
pub trait ComponentLifecycleDispatcher: Send + Sync {
    /// 按顺序调用 `on_create_async`，返回被调用的组件数量
    async fn dispatch_create(
        &self,
        components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError>;

    /// 按顺序调用 `on_destroy_async`，返回被调用的组件数量
    async fn dispatch_destroy(
        &self,
        components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError>;
}

/// 逐个等待组件钩子的分发器，第一个失败的钩子中止分发
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncLifecycleDispatcher;

#[async_trait]
impl ComponentLifecycleDispatcher for AsyncLifecycleDispatcher {
    async fn dispatch_create(
        &self,
        components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError> {
        let mut dispatched = 0;
        for component in components {
            if let Some(hooks) = component.capability::<dyn RegisteredComponentAsync>() {
                hooks.on_create_async().await.map_err(|err| {
                    LifecycleError::hook_failed(component.name(), "on_create_async", err.as_ref())
                })?;
                dispatched += 1;
            }
        }
        debug!("on_create_async 已分发到 {} 个组件", dispatched);
        Ok(dispatched)
    }

    async fn dispatch_destroy(
        &self,
        components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError> {
        let mut dispatched = 0;
        for component in components {
            if let Some(hooks) = component.capability::<dyn RegisteredComponentAsync>() {
                hooks.on_destroy_async().await.map_err(|err| {
                    LifecycleError::hook_failed(component.name(), "on_destroy_async", err.as_ref())
                })?;
                dispatched += 1;
            }
        }
        debug!("on_destroy_async 已分发到 {} 个组件", dispatched);
        Ok(dispatched)
    }
}

/// 不调用任何钩子的分发器
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycleDispatcher;

#[async_trait]
impl ComponentLifecycleDispatcher for NoopLifecycleDispatcher {
    async fn dispatch_create(
        &self,
        _components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError> {
        Ok(0)
    }

    async fn dispatch_destroy(
        &self,
        _components: &[Arc<ComponentHandle>],
    ) -> Result<usize, LifecycleError> {
        Ok(0)
    }
}

/// 按生命周期模式选择分发器
pub fn dispatcher_for(mode: LifecycleMode) -> Arc<dyn ComponentLifecycleDispatcher> {
    match mode {
        LifecycleMode::Async => Arc::new(AsyncLifecycleDispatcher),
        LifecycleMode::Synchronous => Arc::new(NoopLifecycleDispatcher),
    }
}
