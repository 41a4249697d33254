//! Permission entity

use crate::core::error::AdminResult;
use crate::core::field::{FieldAccess, FieldDef, FieldKind, FieldValue};
use crate::core::resource::ResourceSchema;
use crate::core::validation::validators::required;
use crate::core::validation::{FieldChecks, filters};
use crate::impl_resource;
use serde_json::{Map, Value};

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Id, FieldAccess::ReadOnly),
    FieldDef::new("name", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("description", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("builtIn", FieldKind::Boolean, FieldAccess::ReadWrite),
    FieldDef::new("active", FieldKind::Boolean, FieldAccess::ReadWrite),
    FieldDef::new("createdAt", FieldKind::DateTime, FieldAccess::ReadOnly),
    FieldDef::new("updatedAt", FieldKind::DateTime, FieldAccess::ReadOnly),
];

pub static PERMISSION_SCHEMA: ResourceSchema = ResourceSchema {
    plural: "permissions",
    singular: "permission",
    fields: FIELDS,
    unique: &["name"],
};

impl_resource!(
    /// A named grant, identified by its unique `name`
    Permission,
    PERMISSION_SCHEMA,
    {
        name: String,
        description: Option<String>,
        built_in: bool,
        active: bool,
    }
);

impl Permission {
    /// A fresh active, non built-in permission
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_parts(name.into(), None, false, true)
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(FieldValue::String(self.name.clone())),
            "description" => Some(self.description.as_deref().into()),
            "builtIn" => Some(FieldValue::Boolean(self.built_in)),
            "active" => Some(FieldValue::Boolean(self.active)),
            _ => None,
        }
    }

    fn build(input: &Map<String, Value>) -> AdminResult<Self> {
        let mut checks = FieldChecks::new(input);
        let name = checks.string_with(
            "name",
            filters::trim,
            &[&required("Permission name is required")],
        );
        let description = checks.string("description", &[]);
        let built_in = checks.boolean("builtIn");
        let active = checks.boolean("active");
        checks.finish()?;

        let mut permission = Self::named(name.unwrap_or_default());
        permission.description = description;
        permission.built_in = built_in.unwrap_or(false);
        permission.active = active.unwrap_or(true);
        Ok(permission)
    }

    fn patch(&mut self, patch: &Map<String, Value>) -> AdminResult<()> {
        let mut checks = FieldChecks::new(patch);
        let name = if checks.contains("name") {
            checks.string_with(
                "name",
                filters::trim,
                &[&required("Permission name is required")],
            )
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
