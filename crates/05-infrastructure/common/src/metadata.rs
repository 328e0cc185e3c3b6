//! 元数据定义
//!
//! 提供能力类型和作用域的标识信息

use std::any::TypeId;
use std::fmt;

/// 类型信息
///
/// 注册表以 [`TypeId`] 为键，名称只用于日志和错误信息。
/// 支持 `dyn Trait` 这类非 `Sized` 类型，能力接口就是这样标识的。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型名称（不含模块路径）
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 完整类型路径
    pub module_path: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            name: short_type_name(full),
            id: TypeId::of::<T>(),
            module_path: full.to_string(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// 是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 去掉路径前缀，保留 `dyn` 前缀和泛型参数的最后一段
fn short_type_name(full: &str) -> String {
    let (prefix, rest) = match full.strip_prefix("dyn ") {
        Some(rest) => ("dyn ", rest),
        None => ("", full),
    };
    let head = rest.split('<').next().unwrap_or(rest);
    let short = head.rsplit("::").next().unwrap_or(head);
    format!("{prefix}{short}")
}

/// 作用域标识
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建新作用域标识
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域标识
    pub fn root() -> Self {
        Self::new("root")
    }

    /// 创建子作用域标识
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.name, name.into()))
    }
}

impl PartialEq for ScopeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScopeInfo {}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}
    struct Plain;

    #[test]
    fn short_names_drop_module_paths() {
        assert_eq!(TypeInfo::of::<Plain>().name, "Plain");
        assert_eq!(TypeInfo::of::<dyn Greeter>().name, "dyn Greeter");
        assert_eq!(TypeInfo::of::<Vec<Plain>>().name, "Vec");
    }

    #[test]
    fn trait_objects_and_types_have_distinct_ids() {
        assert_ne!(TypeInfo::of::<dyn Greeter>().id, TypeInfo::of::<Plain>().id);
        assert!(TypeInfo::of::<Plain>().is::<Plain>());
    }

    #[test]
    fn child_scope_names_are_dotted() {
        let root = ScopeInfo::root();
        let child = root.child("menu");
        assert_eq!(child.name, "root.menu");
        assert_ne!(root, child);
    }
}
