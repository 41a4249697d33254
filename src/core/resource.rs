//! Resource traits defining the core abstraction for all stored entities

use crate::core::error::{AdminError, AdminResult, ValidationError};
use crate::core::field::{FieldDef, FieldKind, FieldValue};
use crate::core::id::ObjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Raw document key holding the identifier
pub const RAW_ID_KEY: &str = "_id";

/// Raw document key holding the revision marker
pub const RAW_REVISION_KEY: &str = "_rev";

/// Static description of an entity type
///
/// This is the compile-time allow-list used for body whitelisting,
/// filter/sort validation and projection.
#[derive(Debug)]
pub struct ResourceSchema {
    /// The plural resource name used in URLs (e.g., "roles")
    pub plural: &'static str,

    /// The singular resource name (e.g., "role")
    pub singular: &'static str,

    /// Every field the entity declares
    pub fields: &'static [FieldDef],

    /// Fields whose values must be unique across the collection
    pub unique: &'static [&'static str],
}

impl ResourceSchema {
    /// Look up a field definition
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field that may be rendered, filtered or sorted on
    pub fn readable_field(&self, name: &str) -> Option<&FieldDef> {
        self.field(name).filter(|f| f.is_readable())
    }

    /// Names of every readable field
    pub fn readable_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.is_readable()).map(|f| f.name)
    }

    /// Reference-typed readable fields
    pub fn references(&self) -> impl Iterator<Item = &FieldDef> + '_ {
        self.fields
            .iter()
            .filter(|f| f.is_readable() && f.kind.target().is_some())
    }

    /// Whether a raw document key must never be rendered
    pub fn is_hidden(&self, key: &str) -> bool {
        if key == RAW_REVISION_KEY {
            return true;
        }
        self.field(key).is_some_and(|f| !f.is_readable())
    }

    /// Keep only the fields a client may write
    ///
    /// Anything not declared writable is dropped so request bodies
    /// cannot inject unexpected attributes.
    pub fn whitelist(&self, body: &Value) -> Result<Map<String, Value>, ValidationError> {
        let Some(object) = body.as_object() else {
            return Err(ValidationError::field(
                "body",
                body.clone(),
                "type",
                "Request body must be a JSON object",
            ));
        };

        Ok(object
            .iter()
            .filter(|(key, _)| self.field(key).is_some_and(|f| f.is_writable()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    /// The referenced resource of a field, if it is a reference
    pub fn reference_target(&self, name: &str) -> Option<(&'static str, bool)> {
        match self.readable_field(name)?.kind {
            FieldKind::Reference(target) => Some((target, false)),
            FieldKind::ReferenceList(target) => Some((target, true)),
            _ => None,
        }
    }
}

/// Base trait for all stored entities
pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    /// Static field metadata
    fn schema() -> &'static ResourceSchema;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> ObjectId;

    /// Revision marker, bumped on every update
    fn revision(&self) -> u32;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Build a new entity from a whitelisted request body
    fn from_input(input: &Map<String, Value>) -> AdminResult<Self>;

    /// Apply a whitelisted partial update
    fn apply_patch(&mut self, patch: &Map<String, Value>) -> AdminResult<()>;

    /// Refresh `updatedAt` and bump the revision marker
    fn touch(&mut self);

    /// Raw document including internal bookkeeping fields
    fn to_document(&self) -> Result<Map<String, Value>, AdminError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(AdminError::Internal(format!(
                "{} did not serialize to an object: {}",
                Self::schema().singular,
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldAccess;
    use serde_json::json;

    static FIELDS: &[FieldDef] = &[
        FieldDef::new("id", FieldKind::Id, FieldAccess::ReadOnly),
        FieldDef::new("name", FieldKind::String, FieldAccess::ReadWrite),
        FieldDef::new("secret", FieldKind::String, FieldAccess::Internal),
        FieldDef::new("password", FieldKind::String, FieldAccess::WriteOnly),
        FieldDef::new("owner", FieldKind::Reference("users"), FieldAccess::ReadWrite),
    ];

    static SCHEMA: ResourceSchema = ResourceSchema {
        plural: "things",
        singular: "thing",
        fields: FIELDS,
        unique: &["name"],
    };

    #[test]
    fn test_whitelist_drops_undeclared_and_internal_fields() {
        let body = json!({
            "name": "x",
            "secret": "s",
            "password": "p4ssword",
            "isAdmin": true,
            "id": "507f1f77bcf86cd799439011"
        });
        let clean = SCHEMA.whitelist(&body).unwrap();
        let mut keys: Vec<&str> = clean.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["name", "password"]);
    }

    #[test]
    fn test_whitelist_rejects_non_objects() {
        assert!(SCHEMA.whitelist(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_hidden_fields() {
        assert!(SCHEMA.is_hidden("secret"));
        assert!(SCHEMA.is_hidden("password"));
        assert!(SCHEMA.is_hidden("_rev"));
        assert!(!SCHEMA.is_hidden("name"));
    }

    #[test]
    fn test_reference_target() {
        assert_eq!(SCHEMA.reference_target("owner"), Some(("users", false)));
        assert_eq!(SCHEMA.reference_target("name"), None);
        assert_eq!(SCHEMA.references().count(), 1);
    }
}
