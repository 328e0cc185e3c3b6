//! 状态切换通知

use crate::descriptor::StateDescriptor;
use crate::lifecycle::HookResult;
use async_trait::async_trait;

/// 状态切换观察者
///
/// 所有回调都有默认实现，观察者按订阅顺序被调用。
#[async_trait]
pub trait StateObserver: Send + Sync {
    /// 观察者名称，用于日志和错误信息
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 开始加载状态，同步调用，不等待结果
    fn on_begin_load(&self, _descriptor: &StateDescriptor) {}

    /// 状态加载完成
    async fn on_state_loaded(&self, _descriptor: &StateDescriptor) -> HookResult {
        Ok(())
    }

    /// 上一个状态卸载完成
    async fn on_state_unloaded(&self, _descriptor: &StateDescriptor) -> HookResult {
        Ok(())
    }
}
