//! Reusable field filters
//!
//! These filters normalize request values before validation

use serde_json::Value;

/// Filter: trim whitespace from string
pub fn trim(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}
