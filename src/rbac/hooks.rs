//! Write hooks wiring the permission cascade into CRUD

use crate::core::crud::WriteHook;
use crate::core::error::{AdminError, AdminResult, ValidationError};
use crate::core::id::ObjectId;
use crate::entities::{Role, User};
use crate::rbac::cascade::PermissionCascade;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Applies `permissions: [names]` from role bodies through the cascade
///
/// Names are assigned in body order; on update, names no longer listed are
/// revoked. The root role cannot be deleted and its name cannot be taken by
/// another role.
pub struct RolePermissionHook {
    cascade: Arc<PermissionCascade>,
}

impl RolePermissionHook {
    pub fn new(cascade: Arc<PermissionCascade>) -> Self {
        Self { cascade }
    }

    fn check_reserved_name(&self, name: &str) -> AdminResult<()> {
        let name = name.trim();
        if name != self.cascade.root_name() {
            return Ok(());
        }
        Err(ValidationError::field(
            "name",
            name,
            "reserved",
            format!("'{}' is reserved for the root role", name),
        )
        .into())
    }
}

#[async_trait]
impl WriteHook<Role> for RolePermissionHook {
    async fn before_create(&self, role: &mut Role, _input: &Map<String, Value>) -> AdminResult<()> {
        self.check_reserved_name(&role.name)
    }

    async fn before_update(&self, current: &Role, patch: &Map<String, Value>) -> AdminResult<()> {
        match patch.get("name").and_then(Value::as_str) {
            Some(name) if !current.is_root() => self.check_reserved_name(name),
            _ => Ok(()),
        }
    }

    async fn before_delete(&self, role: &Role) -> AdminResult<()> {
        if !role.is_root() {
            return Ok(());
        }
        Err(ValidationError::field(
            "id",
            role.id.to_hex(),
            "builtIn",
            format!("{} is the root role and cannot be deleted", role.name),
        )
        .into())
    }

    async fn after_write(&self, role: Role, input: &Map<String, Value>) -> AdminResult<Role> {
        let Some(requested) = Role::requested_permissions(input)? else {
            return Ok(role);
        };

        let held = self.cascade.permission_names(&role).await?;
        let dropped: Vec<String> = held
            .into_iter()
            .filter(|name| !requested.contains(name))
            .collect();

        let role = self
            .cascade
            .assign_permissions(&role, &requested)
            .await
            .map_err(|failure| {
                tracing::warn!(
                    role = %failure.role.name,
                    completed = ?failure.completed,
                    failed = %failure.failed,
                    "permission assignment stopped"
                );
                AdminError::from(failure)
            })?;

        if dropped.is_empty() {
            return Ok(role);
        }

        let (role, warnings) = self.cascade.revoke_permissions(&role, &dropped).await?;
        for warning in warnings {
            tracing::warn!(role = %warning.role, permission = %warning.permission, "{}", warning);
        }
        Ok(role)
    }
}

/// Gives new users the default role and checks explicit role references
pub struct UserDefaultRoleHook {
    cascade: Arc<PermissionCascade>,
}

impl UserDefaultRoleHook {
    pub fn new(cascade: Arc<PermissionCascade>) -> Self {
        Self { cascade }
    }

    async fn check_role(&self, role_id: &ObjectId) -> AdminResult<()> {
        if self.cascade.find_role(role_id).await?.is_some() {
            return Ok(());
        }
        Err(ValidationError::field(
            "role",
            role_id.to_hex(),
            "reference",
            format!("No role with id '{}'", role_id),
        )
        .into())
    }
}

#[async_trait]
impl WriteHook<User> for UserDefaultRoleHook {
    async fn before_create(&self, user: &mut User, _input: &Map<String, Value>) -> AdminResult<()> {
        match user.role {
            Some(role_id) => self.check_role(&role_id).await?,
            None => match self.cascade.get_default_role().await? {
                Some(role) => user.role = Some(role.id),
                None => tracing::warn!(username = %user.username, "no default role to assign"),
            },
        }
        Ok(())
    }

    async fn before_update(&self, _current: &User, patch: &Map<String, Value>) -> AdminResult<()> {
        // malformed ids are reported by the entity itself
        let role_id = patch
            .get("role")
            .and_then(Value::as_str)
            .and_then(|s| ObjectId::parse_str(s).ok());
        match role_id {
            Some(role_id) => self.check_role(&role_id).await,
            None => Ok(()),
        }
    }
}
