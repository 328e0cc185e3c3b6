//! # Scope Impl
//!
//! 作用域注入与独占状态的具体实现。
//!
//! ## 核心组件
//!
//! - [`ContainerBuilder`] / [`Container`] - 单个作用域的注册表
//! - [`ScopeNode`] - 作用域树节点，未注册的依赖沿父链回退解析
//! - [`RegistrationRecord`] - 从对象模板实例化对象并注册其组件能力
//! - [`RootScope`] - 进程生命周期的根作用域，负责全局数据和入口点
//! - [`StateScope`] - 独占状态作用域，同一时刻最多一个处于激活状态
//! - [`ActiveStateSlot`] - 当前激活状态槽，由组合根显式持有
//! - [`StateHost`] / [`TemplateCatalog`] - 实例化器与模板目录的内存实现
//!
//! ## 使用示例
//!
//! ```rust
//! use scope_impl::{ContainerBuilder, EmptyConfigurator, ScopeNode, World};
//! use scope_abstractions::ResolveExt;
//! use std::sync::Arc;
//!
//! let world = Arc::new(World::new());
//! let root = ScopeNode::new_root("app", world, |builder: &mut ContainerBuilder| {
//!     builder.register_instance(Arc::new(String::from("hello")));
//!     Ok(())
//! });
//! root.configure().unwrap();
//!
//! let child = ScopeNode::new_child(&root, "menu", EmptyConfigurator);
//! child.configure().unwrap();
//! assert_eq!(child.resolve::<String>().unwrap().as_str(), "hello");
//! ```

pub mod container;
pub mod dispatch;
pub mod host;
pub mod object;
pub mod registration;
pub mod root;
pub mod scope;
pub mod slot;
pub mod state;
pub mod template;

pub use container::{BuildCallback, Container, ContainerBuilder, ServiceFactory};
pub use dispatch::{
    dispatcher_for, AsyncLifecycleDispatcher, ComponentLifecycleDispatcher,
    NoopLifecycleDispatcher,
};
pub use host::StateHost;
pub use object::{SceneObject, World};
pub use registration::{register_records, CapabilityCatalog, CapabilityType, RegistrationRecord};
pub use root::{
    EntryPointBuilder, EntryPointDispatcher, EntryPointType, GlobalData, RootScope,
    RootScopeConfig,
};
pub use scope::{EmptyConfigurator, ScopeConfigurator, ScopeNode};
pub use slot::ActiveStateSlot;
pub use state::{StartOutcome, StateDefinition, StatePolicy, StateScope};
pub use template::{ComponentFactory, Instantiator, ObjectTemplate, TemplateCatalog, TemplateLoader};
