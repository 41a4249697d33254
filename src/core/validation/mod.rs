//! Validation and filtering of request bodies
//!
//! Entities read their input through [`FieldChecks`], which applies
//! validators per field and accumulates every failure so a single
//! response can report all offending fields at once.

pub mod filters;
pub mod validators;

pub use validators::Violation;

use crate::core::error::{FieldError, ValidationError};
use crate::core::id::ObjectId;
use serde_json::{Map, Value};

/// A validator usable with [`FieldChecks`]
pub type Check<'a> = &'a (dyn Fn(&str, &Value) -> Result<(), Violation> + Send + Sync);

/// Typed, validating reader over a JSON object
pub struct FieldChecks<'a> {
    input: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldChecks<'a> {
    pub fn new(input: &'a Map<String, Value>) -> Self {
        Self {
            input,
            errors: Vec::new(),
        }
    }

    /// Whether the input carries the field at all
    pub fn contains(&self, field: &str) -> bool {
        self.input.contains_key(field)
    }

    fn value(&self, field: &str) -> Value {
        self.input.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Read an optional string, running `checks` first
    pub fn string(&mut self, field: &str, checks: &[Check<'_>]) -> Option<String> {
        self.string_with(field, |v| v, checks)
    }

    /// Read an optional string through a normalizing filter
    pub fn string_with(
        &mut self,
        field: &str,
        filter: fn(Value) -> Value,
        checks: &[Check<'_>],
    ) -> Option<String> {
        let value = filter(self.value(field));
        for check in checks {
            if let Err(violation) = check(field, &value) {
                self.reject(field, &value, violation);
                return None;
            }
        }

        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => {
                self.reject(
                    field,
                    &other,
                    Violation::new("type", format!("{} must be a string", field)),
                );
                None
            }
        }
    }

    /// Read an optional boolean
    pub fn boolean(&mut self, field: &str) -> Option<bool> {
        match self.value(field) {
            Value::Null => None,
            Value::Bool(b) => Some(b),
            other => {
                self.reject(
                    field,
                    &other,
                    Violation::new("type", format!("{} must be a boolean", field)),
                );
                None
            }
        }
    }

    /// Read an optional document identifier
    pub fn id(&mut self, field: &str) -> Option<ObjectId> {
        match self.value(field) {
            Value::Null => None,
            Value::String(s) => match ObjectId::parse_str(&s) {
                Ok(id) => Some(id),
                Err(err) => {
                    self.reject(
                        field,
                        &Value::String(s),
                        Violation::new("invalid_id", err.to_string()),
                    );
                    None
                }
            },
            other => {
                self.reject(
                    field,
                    &other,
                    Violation::new("type", format!("{} must be an id string", field)),
                );
                None
            }
        }
    }

    /// Read an optional list of strings
    pub fn string_list(&mut self, field: &str) -> Option<Vec<String>> {
        match self.value(field) {
            Value::Null => None,
            Value::Array(items) => {
                let names: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                if names.is_none() {
                    self.reject(
                        field,
                        &Value::Array(items),
                        Violation::new("type", format!("{} must be a list of strings", field)),
                    );
                }
                names
            }
            other => {
                self.reject(
                    field,
                    &other,
                    Violation::new("type", format!("{} must be a list of strings", field)),
                );
                None
            }
        }
    }

    /// Record a failure for `field`
    pub fn reject(&mut self, field: &str, value: &Value, violation: Violation) {
        self.errors.push(FieldError {
            field: field.to_string(),
            value: value.clone(),
            kind: violation.kind.to_string(),
            developer_message: format!(
                "{} failed '{}' validation: {}",
                field, violation.kind, violation.message
            ),
            message: violation.message,
        });
    }

    /// Fail with every recorded error, if any
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_fields(self.errors))
        }
    }
}
