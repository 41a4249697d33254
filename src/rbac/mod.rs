//! Role-based access control: the permission cascade and its CRUD hooks

pub mod cascade;
pub mod hooks;

pub use cascade::{CascadeFailure, CascadeWarning, DEFAULT_ROOT_ROLE, PermissionCascade};
pub use hooks::{RolePermissionHook, UserDefaultRoleHook};
