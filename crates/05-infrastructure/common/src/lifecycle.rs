//! 组件与作用域生命周期

use serde::{Deserialize, Serialize};

/// 服务生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// 单例模式 - 在注册它的作用域内只创建一个实例
    Singleton,
    /// 作用域模式 - 缓存在注册它的作用域容器中
    Scoped,
    /// 瞬时模式 - 每次解析都创建新实例
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl Lifetime {
    /// 该生命周期是否缓存实例
    pub fn is_cached(self) -> bool {
        !matches!(self, Self::Transient)
    }
}

/// 独占状态作用域的生命周期状态
///
/// `Configuring → Starting → Active → Unloading → Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// 已创建，等待配置
    Configuring,
    /// 已配置并注入，等待启动
    Starting,
    /// 当前激活状态
    Active,
    /// 正在拆除
    Unloading,
    /// 已销毁
    Destroyed,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self::Configuring
    }
}

impl ScopeState {
    /// 是否处于终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

/// 组件异步生命周期的派发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleMode {
    /// 依次等待每个组件的异步钩子
    Async,
    /// 不派发组件异步钩子
    Synchronous,
}

impl Default for LifecycleMode {
    fn default() -> Self {
        Self::Async
    }
}
