//! # 状态组合层
//!
//! 这个 crate 把作用域树、独占状态和外部协作方组合成一个可运行的应用，
//! 并提供状态切换控制器。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 使用构建者模式组装根作用域、状态宿主和控制器
//! - **状态切换**: 带互斥保护的异步加载/卸载，按固定顺序调用钩子和观察者
//! - **配置加载**: 从 TOML / JSON 文件读取根作用域、状态和日志配置
//! - **日志初始化**: 基于 `tracing-subscriber` 的开发/生产日志配置
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use state_composition::ApplicationBuilder;
//! use scope_impl::{ObjectTemplate, StateDefinition, StatePolicy};
//! use scope_abstractions::{StateDescriptor, TemplateRef};
//!
//! struct Menu;
//! impl StatePolicy for Menu {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = ApplicationBuilder::new()
//!         .with_template(
//!             "menu",
//!             "states/menu",
//!             ObjectTemplate::new("Menu").with_state(StateDefinition::new(Menu)),
//!         )
//!         .with_state(StateDescriptor::new("menu", TemplateRef::new("menu")))
//!         .build()
//!         .await?;
//!
//!     app.load_state("menu").await?;
//!     assert!(app.active_state().is_some());
//!
//!     app.shutdown();
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;
pub mod controller;
pub mod guard;
pub mod settings;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use application::StateApplication;
pub use builder::{ApplicationBuilder, LoggingConfig};
pub use controller::{Collaborators, LoadOutcome, StateTransitionController};
pub use guard::{InProgress, TransitionGuard};
pub use settings::{
    AppSettings, ComponentSettings, LifecycleSettings, LoggingSettings, RootSettings,
    StateSettings,
};

// 重新导出错误类型
pub use state_common::{ApplicationError, TransitionError};
