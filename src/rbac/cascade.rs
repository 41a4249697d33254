//! Role to permission assignment with root-role propagation
//!
//! Every permission assigned to any role is also assigned to the root role.
//! The root role's set only ever grows: revocations never reach it.
//!
//! All mutations run under one async lock so that the read-modify-write
//! pairs on a role and on the root role never interleave.

use crate::core::error::{AdminError, AdminResult, FieldError, ValidationError};
use crate::core::filter::Selector;
use crate::core::id::ObjectId;
use crate::core::resource::Resource;
use crate::core::store::{Collection, FindOptions};
use crate::entities::{Permission, Role, RoleKind};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name given to the root role when it has to be created
pub const DEFAULT_ROOT_ROLE: &str = "root";

/// Non-fatal outcome of a revocation that changed nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeWarning {
    pub role: String,
    pub permission: String,
    pub message: String,
}

impl CascadeWarning {
    fn not_held(role: &str, permission: &str) -> Self {
        Self {
            role: role.to_string(),
            permission: permission.to_string(),
            message: format!("{} does not have Permission {}", role, permission),
        }
    }

    fn root_is_monotonic(role: &str, permission: &str) -> Self {
        Self {
            role: role.to_string(),
            permission: permission.to_string(),
            message: format!(
                "{} is the root role and keeps Permission {}",
                role, permission
            ),
        }
    }
}

impl fmt::Display for CascadeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A multi-assignment that stopped part way
#[derive(Debug, thiserror::Error)]
#[error("assigning Permission {failed} to {} failed after {} assignment(s): {source}", .role.name, .completed.len())]
pub struct CascadeFailure {
    /// Role state at the failure point
    pub role: Role,
    /// Names assigned before the failure, in order
    pub completed: Vec<String>,
    /// The name that failed
    pub failed: String,
    pub source: AdminError,
}

impl From<CascadeFailure> for AdminError {
    fn from(failure: CascadeFailure) -> Self {
        let message = failure.to_string();
        let progress = FieldError {
            field: "permissions".to_string(),
            value: json!({
                "role": failure.role.id,
                "completed": failure.completed,
                "failed": failure.failed,
            }),
            kind: "cascade".to_string(),
            message: format!(
                "Permission {} was not assigned to {}",
                failure.failed, failure.role.name
            ),
            developer_message: message.clone(),
        };
        AdminError::Partial {
            message,
            progress,
            cause: Box::new(failure.source),
        }
    }
}

/// Maintains role permissions and the root-role invariant
pub struct PermissionCascade {
    roles: Arc<dyn Collection<Role>>,
    permissions: Arc<dyn Collection<Permission>>,
    root_name: String,
    writer: Mutex<()>,
}

impl PermissionCascade {
    pub fn new(
        roles: Arc<dyn Collection<Role>>,
        permissions: Arc<dyn Collection<Permission>>,
    ) -> Self {
        Self::with_root_name(roles, permissions, DEFAULT_ROOT_ROLE)
    }

    pub fn with_root_name(
        roles: Arc<dyn Collection<Role>>,
        permissions: Arc<dyn Collection<Permission>>,
        root_name: impl Into<String>,
    ) -> Self {
        Self {
            roles,
            permissions,
            root_name: root_name.into(),
            writer: Mutex::new(()),
        }
    }

    /// Name the root role is created with
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Assign a permission by name, creating the permission if needed
    ///
    /// Idempotent. The permission is propagated to the root role; when that
    /// fails the assignment on `role` is undone and the error returned.
    pub async fn assign_permission(&self, role: &Role, name: &str) -> AdminResult<Role> {
        let _writer = self.writer.lock().await;
        self.assign_locked(role.id, name).await
    }

    /// Assign several permissions in input order, stopping at the first error
    pub async fn assign_permissions(
        &self,
        role: &Role,
        names: &[String],
    ) -> Result<Role, CascadeFailure> {
        let _writer = self.writer.lock().await;

        let mut current = role.clone();
        let mut completed = Vec::with_capacity(names.len());
        for name in names {
            match self.assign_locked(current.id, name).await {
                Ok(updated) => {
                    current = updated;
                    completed.push(name.clone());
                }
                Err(source) => {
                    return Err(CascadeFailure {
                        role: current,
                        completed,
                        failed: name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(current)
    }

    async fn assign_locked(&self, role_id: ObjectId, name: &str) -> AdminResult<Role> {
        let permission = self.find_or_create_permission(name).await?;
        let mut role = self.load_role(&role_id).await?;

        if role.holds(&permission.id) {
            tracing::debug!(role = %role.name, permission = %permission.name, "already assigned");
            return Ok(role);
        }

        role.permissions.push(permission.id);
        role.touch();
        let role = self.roles.save(role).await?;

        if !role.is_root() {
            if let Err(err) = self.sync_root(&permission).await {
                tracing::warn!(
                    role = %role.name,
                    permission = %permission.name,
                    error = %err,
                    "root role sync failed, undoing assignment"
                );
                self.undo_assignment(&role, &permission.id).await;
                return Err(err);
            }
        }

        tracing::info!(role = %role.name, permission = %permission.name, "permission assigned");
        Ok(role)
    }

    async fn sync_root(&self, permission: &Permission) -> AdminResult<()> {
        let mut root = self.root_locked().await?;
        if root.holds(&permission.id) {
            return Ok(());
        }

        root.permissions.push(permission.id);
        root.touch();
        self.roles.save(root).await?;
        tracing::debug!(permission = %permission.name, "propagated to root role");
        Ok(())
    }

    async fn undo_assignment(&self, role: &Role, permission_id: &ObjectId) {
        let mut reverted = role.clone();
        reverted.permissions.retain(|id| id != permission_id);
        reverted.touch();
        if let Err(err) = self.roles.save(reverted).await {
            tracing::error!(role = %role.name, error = %err, "failed to undo permission assignment");
        }
    }

    // =========================================================================
    // Revocation
    // =========================================================================

    /// Revoke a permission by name
    ///
    /// Revoking something the role does not hold, or anything from the root
    /// role, changes nothing and yields a warning.
    pub async fn revoke_permission(
        &self,
        role: &Role,
        name: &str,
    ) -> AdminResult<(Role, Option<CascadeWarning>)> {
        let _writer = self.writer.lock().await;
        self.revoke_locked(role.id, name).await
    }

    /// Revoke several permissions in input order, collecting every warning
    pub async fn revoke_permissions(
        &self,
        role: &Role,
        names: &[String],
    ) -> AdminResult<(Role, Vec<CascadeWarning>)> {
        let _writer = self.writer.lock().await;

        let mut current = role.clone();
        let mut warnings = Vec::new();
        for name in names {
            let (updated, warning) = self.revoke_locked(current.id, name).await?;
            current = updated;
            warnings.extend(warning);
        }
        Ok((current, warnings))
    }

    async fn revoke_locked(
        &self,
        role_id: ObjectId,
        name: &str,
    ) -> AdminResult<(Role, Option<CascadeWarning>)> {
        let mut role = self.load_role(&role_id).await?;
        let permission = self
            .permissions
            .find_one(&Selector::eq("name", name.trim()))
            .await?
            .filter(|p| role.holds(&p.id));

        let Some(permission) = permission else {
            let warning = CascadeWarning::not_held(&role.name, name);
            tracing::warn!(role = %role.name, permission = name, "{}", warning);
            return Ok((role, Some(warning)));
        };

        if role.is_root() {
            let warning = CascadeWarning::root_is_monotonic(&role.name, name);
            tracing::warn!(role = %role.name, permission = name, "{}", warning);
            return Ok((role, Some(warning)));
        }

        role.permissions.retain(|id| *id != permission.id);
        role.touch();
        let role = self.roles.save(role).await?;

        tracing::info!(role = %role.name, permission = %permission.name, "permission revoked");
        Ok((role, None))
    }

    // =========================================================================
    // Default and root roles
    // =========================================================================

    /// Mark the role named `name` as the only default role
    ///
    /// When no role has that name, no role is default afterwards.
    pub async fn set_default_role(&self, name: &str) -> AdminResult<Option<Role>> {
        let _writer = self.writer.lock().await;

        let defaults = self
            .roles
            .find(&Selector::eq("isDefault", true), &FindOptions::default())
            .await?;
        for mut role in defaults.into_iter().filter(|r| r.name != name) {
            role.is_default = false;
            role.touch();
            self.roles.save(role).await?;
        }

        let Some(mut role) = self.roles.find_one(&Selector::eq("name", name)).await? else {
            tracing::warn!(role = name, "no such role, no default role is set");
            return Ok(None);
        };
        if !role.is_default {
            role.is_default = true;
            role.touch();
            role = self.roles.save(role).await?;
        }

        tracing::info!(role = %role.name, "default role set");
        Ok(Some(role))
    }

    /// The role marked default, if any
    pub async fn get_default_role(&self) -> AdminResult<Option<Role>> {
        self.roles
            .find_one(&Selector::eq("isDefault", true))
            .await
    }

    /// The root role, created on first use
    pub async fn root_role(&self) -> AdminResult<Role> {
        let _writer = self.writer.lock().await;
        self.root_locked().await
    }

    async fn root_locked(&self) -> AdminResult<Role> {
        let existing = self
            .roles
            .find_one(&Selector::eq("kind", RoleKind::Root.as_str()))
            .await?;
        if let Some(root) = existing {
            return Ok(root);
        }

        let named = self
            .roles
            .find_one(&Selector::eq("name", self.root_name.as_str()))
            .await?;
        if let Some(mut role) = named {
            role.kind = RoleKind::Root;
            role.built_in = true;
            role.touch();
            let root = self.roles.save(role).await?;
            tracing::warn!(role = %root.name, "promoted existing role to root");
            return Ok(root);
        }

        let root = self.roles.save(Role::root(self.root_name.as_str())).await?;
        tracing::info!(role = %root.name, "created root role");
        Ok(root)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Get a role by id
    pub async fn find_role(&self, id: &ObjectId) -> AdminResult<Option<Role>> {
        self.roles.find_by_id(id).await
    }

    /// Whether `role` currently holds the permission named `name`
    pub async fn has_permission(&self, role: &Role, name: &str) -> AdminResult<bool> {
        let permission = self
            .permissions
            .find_one(&Selector::eq("name", name.trim()))
            .await?;
        Ok(permission.is_some_and(|p| role.holds(&p.id)))
    }

    /// Names of the permissions held by `role`, in assignment order
    pub async fn permission_names(&self, role: &Role) -> AdminResult<Vec<String>> {
        let mut names = Vec::with_capacity(role.permissions.len());
        for id in &role.permissions {
            if let Some(permission) = self.permissions.find_by_id(id).await? {
                names.push(permission.name);
            }
        }
        Ok(names)
    }

    async fn load_role(&self, id: &ObjectId) -> AdminResult<Role> {
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("role", id))
    }

    async fn find_or_create_permission(&self, name: &str) -> AdminResult<Permission> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::field(
                "permissions",
                name,
                "required",
                "Permission name is required",
            )
            .into());
        }

        if let Some(existing) = self.permissions.find_one(&Selector::eq("name", name)).await? {
            return Ok(existing);
        }

        let created = self.permissions.save(Permission::named(name)).await?;
        tracing::info!(permission = %created.name, "created permission");
        Ok(created)
    }
}
