//! # Scope Abstractions
//!
//! 作用域注入抽象层，定义依赖解析、组件异步生命周期和状态切换协作方的核心接口。
//!
//! ## 核心接口
//!
//! - [`Resolve`] / [`ResolveExt`] - 依赖解析接口
//! - [`Inject`] - 外部对象注入接口
//! - [`RegisteredComponentAsync`] / [`GameStateAsync`] - 组件异步生命周期钩子
//! - [`Startable`] / [`AsyncStartable`] - 根作用域入口点
//! - [`TemplateResolver`] / [`ResourceReclaimer`] - 状态切换的外部协作方
//! - [`StateObserver`] - 状态切换通知

pub mod collaborator;
pub mod descriptor;
pub mod lifecycle;
pub mod observer;
pub mod resolver;

pub use collaborator::*;
pub use descriptor::*;
pub use lifecycle::*;
pub use observer::*;
pub use resolver::*;
