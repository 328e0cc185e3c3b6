//! 组件异步生命周期与入口点接口

use async_trait::async_trait;

/// 生命周期钩子的返回类型
pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// 已注册组件的异步生命周期
///
/// 状态作用域注册的组件若提供此能力，会在作用域构建完成后按注册顺序收到
/// `on_create_async`，在状态拆除前按注册顺序收到 `on_destroy_async`。
#[async_trait]
pub trait RegisteredComponentAsync: Send + Sync {
    /// 作用域构建完成后调用
    async fn on_create_async(&self) -> HookResult {
        Ok(())
    }

    /// 状态拆除前调用
    async fn on_destroy_async(&self) -> HookResult {
        Ok(())
    }
}

/// 状态对象上组件的异步加载/卸载钩子
///
/// 由状态切换控制器按组件挂载顺序调用。
#[async_trait]
pub trait GameStateAsync: Send + Sync {
    /// 状态加载时调用
    async fn load_async(&self) -> HookResult;

    /// 状态卸载时调用
    async fn unload_async(&self) -> HookResult;
}

/// 同步入口点
pub trait Startable: Send + Sync {
    /// 根作用域构建完成后调用一次
    fn start(&self);
}

/// 异步入口点
#[async_trait]
pub trait AsyncStartable: Send + Sync {
    /// 根作用域构建完成后调用一次，在所有同步入口点之后
    async fn start_async(&self) -> HookResult;
}
