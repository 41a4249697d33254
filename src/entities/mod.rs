//! Stored entities: permissions, roles and users

pub mod macros;
pub mod password;
pub mod permission;
pub mod role;
pub mod user;

pub use password::{HashedPassword, PasswordCrypto};
pub use permission::{PERMISSION_SCHEMA, Permission};
pub use role::{ROLE_SCHEMA, Role, RoleKind};
pub use user::{USER_SCHEMA, User, unique_username};
