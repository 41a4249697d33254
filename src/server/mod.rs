//! Server module exposing the admin resources over HTTP
//!
//! - [`AdminHost`] holds the collections, CRUD operations and cascade
//! - [`EntityRegistry`] turns them into per-resource routes
//! - [`ServerBuilder`] wires configuration, bootstrap and graceful shutdown

pub mod builder;
pub mod entity_registry;
pub mod handlers;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry, ResourceDescriptor};
pub use handlers::ResourceState;
pub use host::{AdminHost, EntityStores};
pub use router::build_router;
