//! Reusable field validators
//!
//! Entities run these against request bodies before building a document

use crate::core::field::FieldFormat;
use serde_json::Value;

/// Why a field value was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Machine readable type (`required`, `length`, `format`, ...)
    pub kind: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validator: field is required (not null, not an empty string)
pub fn required(
    message: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), Violation> + Send + Sync + Clone {
    move |_: &str, value: &Value| {
        let missing = match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if missing {
            Err(Violation::new("required", message))
        } else {
            Ok(())
        }
    }
}

/// Validator: string length must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), Violation> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if len < min {
                Err(Violation::new(
                    "length",
                    format!("{} has to be at least {} characters", field, min),
                ))
            } else if len > max {
                Err(Violation::new(
                    "length",
                    format!("{} must not exceed {} characters", field, max),
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string must look like an e-mail address
pub fn email(
    message: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), Violation> + Send + Sync + Clone {
    move |_: &str, value: &Value| match value.as_str() {
        Some(s) if !FieldFormat::Email.validate(s) => Err(Violation::new("format", message)),
        _ => Ok(()),
    }
}
