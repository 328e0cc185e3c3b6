//! # State Common
//!
//! 这个 crate 提供了 Lorn Stage 作用域注入与状态生命周期系统的公共类型。
//!
//! ## 核心组件
//!
//! - [`TypeInfo`] - 能力/服务类型的标识
//! - [`ScopeInfo`] - 作用域标识
//! - [`ComponentHandle`] - 挂载在对象上的组件及其能力表
//! - [`ScopeState`] / [`Lifetime`] / [`LifecycleMode`] - 生命周期相关枚举
//! - 错误类型：[`DependencyError`]、[`ConfigurationError`]、[`TransitionError`] 等
//!
//! ## 设计原则
//!
//! - 能力查询基于显式的能力表，不依赖运行时反射
//! - 同一逻辑线程上的协作式挂起，锁不跨越 `.await`

pub mod component;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
