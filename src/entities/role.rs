//! Role entity

use crate::core::error::AdminResult;
use crate::core::field::{FieldAccess, FieldDef, FieldKind, FieldValue};
use crate::core::id::ObjectId;
use crate::core::resource::ResourceSchema;
use crate::core::validation::validators::required;
use crate::core::validation::{FieldChecks, filters};
use crate::impl_resource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Id, FieldAccess::ReadOnly),
    FieldDef::new("name", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("description", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("builtIn", FieldKind::Boolean, FieldAccess::ReadWrite),
    FieldDef::new("active", FieldKind::Boolean, FieldAccess::ReadWrite),
    FieldDef::new("isDefault", FieldKind::Boolean, FieldAccess::ReadOnly),
    FieldDef::new("kind", FieldKind::String, FieldAccess::ReadOnly),
    FieldDef::new(
        "permissions",
        FieldKind::ReferenceList("permissions"),
        FieldAccess::ReadWrite,
    ),
    FieldDef::new("createdAt", FieldKind::DateTime, FieldAccess::ReadOnly),
    FieldDef::new("updatedAt", FieldKind::DateTime, FieldAccess::ReadOnly),
];

pub static ROLE_SCHEMA: ResourceSchema = ResourceSchema {
    plural: "roles",
    singular: "role",
    fields: FIELDS,
    unique: &["name"],
};

/// Distinguishes the root role from every other role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    #[default]
    Normal,
    /// Accumulates every permission ever assigned to any role
    Root,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Normal => "normal",
            RoleKind::Root => "root",
        }
    }
}

impl_resource!(
    /// A named set of permissions
    ///
    /// `permissions` holds permission ids in assignment order, without
    /// duplicates. Request bodies carry permission *names* instead; those
    /// are applied through the permission cascade, not by the entity.
    Role,
    ROLE_SCHEMA,
    {
        name: String,
        description: Option<String>,
        built_in: bool,
        active: bool,
        is_default: bool,
        kind: RoleKind,
        permissions: Vec<ObjectId>,
    }
);

impl Role {
    /// A fresh active normal role without permissions
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_parts(
            name.into(),
            None,
            false,
            true,
            false,
            RoleKind::Normal,
            Vec::new(),
        )
    }

    /// A fresh root role
    pub fn root(name: impl Into<String>) -> Self {
        let mut role = Self::named(name);
        role.kind = RoleKind::Root;
        role.built_in = true;
        role
    }

    pub fn is_root(&self) -> bool {
        self.kind == RoleKind::Root
    }

    /// Whether the permission id is assigned to this role
    pub fn holds(&self, permission: &ObjectId) -> bool {
        self.permissions.contains(permission)
    }

    /// Permission names carried by a request body, if any
    pub fn requested_permissions(input: &Map<String, Value>) -> AdminResult<Option<Vec<String>>> {
        let mut checks = FieldChecks::new(input);
        let names = checks.string_list("permissions");
        checks.finish()?;

        Ok(names.map(|names| {
            let mut unique: Vec<String> = Vec::with_capacity(names.len());
            for name in names.into_iter().map(|n| n.trim().to_string()) {
                if !name.is_empty() && !unique.contains(&name) {
                    unique.push(name);
                }
            }
            unique
        }))
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(FieldValue::String(self.name.clone())),
            "description" => Some(self.description.as_deref().into()),
            "builtIn" => Some(FieldValue::Boolean(self.built_in)),
            "active" => Some(FieldValue::Boolean(self.active)),
            "isDefault" => Some(FieldValue::Boolean(self.is_default)),
            "kind" => Some(FieldValue::String(self.kind.as_str().to_string())),
            "permissions" => Some(FieldValue::List(
                self.permissions.iter().copied().map(FieldValue::Id).collect(),
            )),
            _ => None,
        }
    }

    fn build(input: &Map<String, Value>) -> AdminResult<Self> {
        Self::requested_permissions(input)?;

        let mut checks = FieldChecks::new(input);
        let name = checks.string_with("name", filters::trim, &[&required("Role name is required")]);
        let description = checks.string("description", &[]);
        let built_in = checks.boolean("builtIn");
        let active = checks.boolean("active");
        checks.finish()?;

        let mut role = Self::named(name.unwrap_or_default());
        role.description = description;
        role.built_in = built_in.unwrap_or(false);
        role.active = active.unwrap_or(true);
        Ok(role)
    }

    fn patch(&mut self, patch: &Map<String, Value>) -> AdminResult<()> {
        Self::requested_permissions(patch)?;

        let mut checks = FieldChecks::new(patch);
        let name = if checks.contains("name") {
            checks.string_with("name", filters::trim, &[&required("Role name is required")])
        } else {
            None
        };
        let description = checks.string("description", &[]);
        let built_in = checks.boolean("builtIn");
        let active = checks.boolean("active");
        checks.finish()?;

        if let Some(name) = name {
            self.name = name;
        }
        if patch.contains_key("description") {
            self.description = description;
        }
        if let Some(built_in) = built_in {
            self.built_in = built_in;
        }
        if let Some(active) = active {
            self.active = active;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::Resource;
    use serde_json::json;

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_ignores_permission_names() {
        let role = Role::from_input(&input(json!({
            "name": "editor",
            "permissions": ["posts:write"]
        })))
        .unwrap();
        assert_eq!(role.name, "editor");
        assert!(role.permissions.is_empty());
        assert_eq!(role.kind, RoleKind::Normal);
        assert!(!role.is_default);
    }

    #[test]
    fn test_malformed_permission_list_is_rejected() {
        let err = Role::from_input(&input(json!({
            "name": "editor",
            "permissions": "posts:write"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("permissions"));
    }

    #[test]
    fn test_requested_permissions_are_deduplicated() {
        let names = Role::requested_permissions(&input(json!({
            "permissions": ["a", " b", "a", ""]
        })))
        .unwrap();
        assert_eq!(names, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(Role::requested_permissions(&Map::new()).unwrap(), None);
    }

    #[test]
    fn test_root_role() {
        let root = Role::root("root");
        assert!(root.is_root());
        assert!(root.built_in);
        assert!(root.active);
        assert_eq!(
            root.field_value("kind"),
            Some(FieldValue::String("root".to_string()))
        );
        assert_eq!(root.to_document().unwrap()["kind"], "root");
    }

    #[test]
    fn test_permissions_field_value_is_a_list_of_ids() {
        let mut role = Role::named("editor");
        let id = ObjectId::new();
        role.permissions.push(id);
        assert!(role.holds(&id));
        assert!(role.field_value("permissions").unwrap().matches_literal(&id.to_hex()));
    }
}
