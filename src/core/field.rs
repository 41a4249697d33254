//! Field metadata, field values and format validation

use crate::core::id::ObjectId;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// A polymorphic field value read from an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Id(ObjectId),
    DateTime(DateTime<Utc>),
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Compare against a query-string literal
    ///
    /// Lists match when any element matches.
    pub fn matches_literal(&self, literal: &str) -> bool {
        match self {
            FieldValue::String(s) => s == literal,
            FieldValue::Integer(i) => literal.parse::<i64>().is_ok_and(|v| v == *i),
            FieldValue::Boolean(b) => literal.parse::<bool>().is_ok_and(|v| v == *b),
            FieldValue::Id(id) => literal.eq_ignore_ascii_case(&id.to_hex()),
            FieldValue::DateTime(dt) => DateTime::parse_from_rfc3339(literal)
                .is_ok_and(|v| v.with_timezone(&Utc) == *dt),
            FieldValue::List(items) => items.iter().any(|item| item.matches_literal(literal)),
            FieldValue::Null => literal == "null",
        }
    }

    /// Case-sensitive substring containment, only meaningful for strings
    pub fn contains_literal(&self, literal: &str) -> bool {
        match self {
            FieldValue::String(s) => s.contains(literal),
            _ => false,
        }
    }

    /// Total order used for sorting; nulls sort first
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (String(a), String(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Id(a), Id(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (List(a), List(b)) => a.len().cmp(&b.len()),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Boolean(_) => 1,
            FieldValue::Integer(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::Id(_) => 4,
            FieldValue::DateTime(_) => 5,
            FieldValue::List(_) => 6,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::from)
    }
}

/// The declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Integer,
    DateTime,
    Id,
    /// Reference to a single document of the named resource (plural name)
    Reference(&'static str),
    /// Ordered set of references to documents of the named resource
    ReferenceList(&'static str),
}

impl FieldKind {
    /// The referenced resource, if this is a reference kind
    pub fn target(&self) -> Option<&'static str> {
        match self {
            FieldKind::Reference(target) | FieldKind::ReferenceList(target) => Some(target),
            _ => None,
        }
    }
}

/// Who may read and write a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Readable and accepted from request bodies
    ReadWrite,
    /// Readable, managed by the system
    ReadOnly,
    /// Accepted from request bodies, never rendered (e.g. `password`)
    WriteOnly,
    /// Never rendered, never accepted (credential material, revision markers)
    Internal,
}

/// Static description of one entity field
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub access: FieldAccess,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind, access: FieldAccess) -> Self {
        Self { name, kind, access }
    }

    /// Field may appear in projections, filters and sort keys
    pub fn is_readable(&self) -> bool {
        matches!(self.access, FieldAccess::ReadWrite | FieldAccess::ReadOnly)
    }

    /// Field is accepted from request bodies
    pub fn is_writable(&self) -> bool {
        matches!(self.access, FieldAccess::ReadWrite | FieldAccess::WriteOnly)
    }
}

/// Field format validators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Email,
}

impl FieldFormat {
    /// Validate a string against this format
    pub fn validate(&self, value: &str) -> bool {
        match self {
            FieldFormat::Email => Self::is_valid_email(value),
        }
    }

    fn is_valid_email(email: &str) -> bool {
        static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = EMAIL_REGEX.get_or_init(|| Regex::new(r"^.+@.+\..+$").unwrap());
        regex.is_match(email)
    }
}
