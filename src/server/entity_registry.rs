//! Entity registry collecting per-resource route descriptors

use crate::core::resource::Resource;
use crate::server::handlers::{
    ResourceState, create_resource, delete_resource, list_resources, read_resource,
    update_resource,
};
use axum::Router;
use axum::routing::get;
use indexmap::IndexMap;

/// Describes how to build the routes of one resource
pub trait EntityDescriptor: Send + Sync {
    /// The singular resource name (e.g., "role")
    fn entity_type(&self) -> &str;

    /// The plural form (e.g., "roles")
    fn plural(&self) -> &str;

    /// Build the CRUD routes for this resource
    fn build_routes(&self) -> Router;
}

/// Descriptor serving the generic handlers for resource `T`
///
/// - `GET    /{plural}`
/// - `POST   /{plural}`
/// - `GET    /{plural}/{id}`
/// - `PUT    /{plural}/{id}`
/// - `DELETE /{plural}/{id}`
pub struct ResourceDescriptor<T: Resource> {
    state: ResourceState<T>,
}

impl<T: Resource> ResourceDescriptor<T> {
    pub fn new(state: ResourceState<T>) -> Self {
        Self { state }
    }
}

impl<T: Resource> EntityDescriptor for ResourceDescriptor<T> {
    fn entity_type(&self) -> &str {
        T::schema().singular
    }

    fn plural(&self) -> &str {
        T::schema().plural
    }

    fn build_routes(&self) -> Router {
        let plural = T::schema().plural;
        Router::new()
            .route(
                &format!("/{}", plural),
                get(list_resources::<T>).post(create_resource::<T>),
            )
            .route(
                &format!("/{}/{{id}}", plural),
                get(read_resource::<T>)
                    .put(update_resource::<T>)
                    .delete(delete_resource::<T>),
            )
            .with_state(self.state.clone())
    }
}

/// Registry for all resources in the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: IndexMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: IndexMap::new(),
        }
    }

    /// Register a descriptor, replacing any previous one for the same type
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Build a router with all registered resource routes
    pub fn build_routes(&self) -> Router {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(descriptor.build_routes())
            })
    }

    /// All registered resource types, in registration order
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDescriptor {
        entity_type: String,
        plural: String,
    }

    impl MockDescriptor {
        fn new(entity_type: &str, plural: &str) -> Self {
            Self {
                entity_type: entity_type.to_string(),
                plural: plural.to_string(),
            }
        }
    }

    impl EntityDescriptor for MockDescriptor {
        fn entity_type(&self) -> &str {
            &self.entity_type
        }

        fn plural(&self) -> &str {
            &self.plural
        }

        fn build_routes(&self) -> Router {
            Router::new()
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        assert!(EntityRegistry::new().entity_types().is_empty());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("user", "users")));
        registry.register(Box::new(MockDescriptor::new("role", "roles")));
        registry.register(Box::new(MockDescriptor::new("permission", "permissions")));
        assert_eq!(registry.entity_types(), vec!["user", "role", "permission"]);
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("role", "roles")));
        registry.register(Box::new(MockDescriptor::new("role", "groups")));
        assert_eq!(registry.entity_types().len(), 1);
    }
}
