//! # useradmin
//!
//! An administrative REST backend over three resources: users, roles and
//! permissions.
//!
//! ## Features
//!
//! - **Generic resource queries**: field projection, single-level embedding,
//!   filtering, sorting and Link-header pagination for every resource
//! - **Static schemas**: each resource declares its fields and their access
//!   level; queries naming unknown or hidden fields are rejected, request
//!   bodies are stripped down to the writable fields
//! - **Permission cascade**: permissions are created on first assignment and
//!   the root role always holds every permission ever granted
//! - **Default role**: new users without an explicit role get the default one
//! - **Argon2 passwords**: write-only on the wire, hashed at rest
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use useradmin::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_config(AdminConfig::from_env()?)
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod rbac;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AdminError, AdminResult, Collection, Crud, EmbedResolver, FieldAccess, FieldDef,
        FieldKind, FieldValue, FilterEvaluator, FindOptions, ObjectId, PageLinks, Paginator,
        Projector, QueryParser, RawQuery, Resource, ResourceQuery, ResourceSchema, Selector,
        StorageError, ValidationError, View, WriteHook,
    };

    // === Macros ===
    pub use crate::impl_resource;

    // === Entities ===
    pub use crate::entities::{PasswordCrypto, Permission, Role, RoleKind, User};

    // === Cascade ===
    pub use crate::rbac::{CascadeFailure, CascadeWarning, PermissionCascade};

    // === Storage ===
    pub use crate::storage::InMemoryCollection;

    // === Config ===
    pub use crate::config::AdminConfig;

    // === Server ===
    pub use crate::server::{AdminHost, EntityStores, ServerBuilder, build_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
