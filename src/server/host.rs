//! Server host holding all application state
//!
//! The host owns the storage collections, one [`Crud`] per resource and the
//! permission cascade. It is transport-agnostic; the REST router is built
//! from it.

use crate::config::AdminConfig;
use crate::core::crud::Crud;
use crate::core::error::AdminResult;
use crate::core::filter::Selector;
use crate::core::id::ObjectId;
use crate::core::projection::{EmbedResolver, Projector};
use crate::core::query::{FilterClause, FilterOp, QueryParser};
use crate::core::resource::{Resource, ResourceSchema};
use crate::core::store::{Collection, FindOptions};
use crate::entities::{Permission, Role, User};
use crate::rbac::{PermissionCascade, RolePermissionHook, UserDefaultRoleHook};
use crate::server::entity_registry::{EntityRegistry, ResourceDescriptor};
use crate::server::handlers::ResourceState;
use crate::storage::InMemoryCollection;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The three collections of the admin backend
#[derive(Clone)]
pub struct EntityStores {
    pub permissions: Arc<dyn Collection<Permission>>,
    pub roles: Arc<dyn Collection<Role>>,
    pub users: Arc<dyn Collection<User>>,
}

impl EntityStores {
    /// Fresh in-memory collections
    pub fn in_memory() -> Self {
        Self {
            permissions: Arc::new(InMemoryCollection::<Permission>::new()),
            roles: Arc::new(InMemoryCollection::<Role>::new()),
            users: Arc::new(InMemoryCollection::<User>::new()),
        }
    }
}

async fn fetch_documents<T: Resource>(
    collection: &dyn Collection<T>,
    ids: &[ObjectId],
) -> AdminResult<Vec<Map<String, Value>>> {
    let clause = FilterClause {
        field: "id".to_string(),
        op: FilterOp::In,
        values: ids.iter().map(ObjectId::to_hex).collect(),
    };
    let selector = Selector::compile(T::schema(), &[clause])?;

    collection
        .find(&selector, &FindOptions::default())
        .await?
        .iter()
        .map(Resource::to_document)
        .collect()
}

#[async_trait]
impl EmbedResolver for EntityStores {
    fn schema_of(&self, resource: &str) -> Option<&'static ResourceSchema> {
        match resource {
            "permissions" => Some(Permission::schema()),
            "roles" => Some(Role::schema()),
            "users" => Some(User::schema()),
            _ => None,
        }
    }

    async fn resolve(
        &self,
        resource: &str,
        ids: &[ObjectId],
    ) -> AdminResult<Vec<Map<String, Value>>> {
        match resource {
            "permissions" => fetch_documents(self.permissions.as_ref(), ids).await,
            "roles" => fetch_documents(self.roles.as_ref(), ids).await,
            "users" => fetch_documents(self.users.as_ref(), ids).await,
            _ => Ok(Vec::new()),
        }
    }
}

/// Host context containing all application state
pub struct AdminHost {
    pub config: AdminConfig,
    pub stores: EntityStores,
    pub cascade: Arc<PermissionCascade>,
    pub permissions: Crud<Permission>,
    pub roles: Crud<Role>,
    pub users: Crud<User>,
}

impl AdminHost {
    /// Wire the CRUD operations and the cascade over `stores`
    pub fn new(config: AdminConfig, stores: EntityStores) -> Self {
        let cascade = Arc::new(PermissionCascade::with_root_name(
            stores.roles.clone(),
            stores.permissions.clone(),
            config.root_role.clone(),
        ));
        let resolver: Arc<dyn EmbedResolver> = Arc::new(stores.clone());
        let projector = Projector::new(config.href_base());
        let parser = QueryParser::new(config.default_page_size, config.max_page_size);

        let permissions = Crud::new(
            stores.permissions.clone(),
            resolver.clone(),
            projector.clone(),
            parser.clone(),
        );
        let roles = Crud::new(
            stores.roles.clone(),
            resolver.clone(),
            projector.clone(),
            parser.clone(),
        )
        .with_hook(Arc::new(RolePermissionHook::new(cascade.clone())));
        let users = Crud::new(stores.users.clone(), resolver, projector, parser)
            .with_hook(Arc::new(UserDefaultRoleHook::new(cascade.clone())));

        Self {
            config,
            stores,
            cascade,
            permissions,
            roles,
            users,
        }
    }

    /// Apply startup state: root role and configured default role
    pub async fn bootstrap(&self) -> AdminResult<()> {
        let root = self.cascade.root_role().await?;
        tracing::debug!(role = %root.name, "root role ready");

        if let Some(name) = &self.config.default_role {
            if self.cascade.set_default_role(name).await?.is_none() {
                tracing::warn!(role = %name, "configured default role does not exist");
            }
        }
        Ok(())
    }

    /// Registry of the resource routes
    pub fn entity_registry(&self) -> Result<EntityRegistry> {
        let public_url = self.config.public_url()?;

        let mut registry = EntityRegistry::new();
        registry.register(Box::new(ResourceDescriptor::new(ResourceState::new(
            self.permissions.clone(),
            public_url.clone(),
        ))));
        registry.register(Box::new(ResourceDescriptor::new(ResourceState::new(
            self.roles.clone(),
            public_url.clone(),
        ))));
        registry.register(Box::new(ResourceDescriptor::new(ResourceState::new(
            self.users.clone(),
            public_url,
        ))));
        Ok(registry)
    }
}
