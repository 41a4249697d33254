//! Typed error handling for the admin backend
//!
//! # Error Categories
//!
//! - [`ValidationError`]: bad input shape or constraint violation (400)
//! - [`AdminError::NotFound`]: no document for the given id (404)
//! - [`AdminError::InvalidId`]: malformed identifier (400)
//! - [`StorageError`]: opaque failure from the storage collaborator (500)
//! - [`AdminError::Partial`]: a multi-step write stopped part way; status
//!   and name follow the underlying error
//!
//! Every variant renders the same JSON body:
//!
//! ```json
//! { "code": 400, "name": "ValidationError", "message": "...",
//!   "errors": [{ "field": "name", "value": "", "type": "required",
//!                "message": "...", "developerMessage": "..." }] }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

/// The main error type of the crate
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Input validation errors (body, query string, uniqueness)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No document matched the identifier
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: String, id: String },

    /// The identifier is not a 24 character hex string
    #[error("Invalid id format: '{value}'")]
    InvalidId { value: String },

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A sequence of writes stopped part way
    ///
    /// Carries the underlying error plus a field error describing what
    /// was and was not applied.
    #[error("{message}")]
    Partial {
        message: String,
        progress: FieldError,
        #[source]
        cause: Box<AdminError>,
    },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Numeric HTTP status
    pub code: u16,
    /// Taxonomy name (`ValidationError`, `NotFoundError`, ...)
    pub name: &'static str,
    /// Human-readable message
    pub message: String,
    /// Per-field details, empty when not applicable
    pub errors: Vec<FieldError>,
}

impl AdminError {
    /// Shorthand for a not-found error
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        AdminError::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
            AdminError::InvalidId { .. } => StatusCode::BAD_REQUEST,
            AdminError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::Partial { cause, .. } => cause.status_code(),
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the taxonomy name for this error
    pub fn error_name(&self) -> &'static str {
        match self {
            AdminError::Validation(_) => "ValidationError",
            AdminError::NotFound { .. } => "NotFoundError",
            AdminError::InvalidId { .. } => "InvalidIdError",
            AdminError::Storage(_) => "StorageError",
            AdminError::Partial { cause, .. } => cause.error_name(),
            AdminError::Internal(_) => "InternalError",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        let errors = match self {
            AdminError::Validation(err) => err.errors.clone(),
            AdminError::InvalidId { value } => vec![FieldError {
                field: "id".to_string(),
                value: Value::String(value.clone()),
                kind: "invalid_id".to_string(),
                message: "id must be a 24 character hex string".to_string(),
                developer_message: self.to_string(),
            }],
            AdminError::Partial {
                progress, cause, ..
            } => {
                let mut errors = cause.to_response().errors;
                errors.push(progress.clone());
                errors
            }
            _ => Vec::new(),
        };

        ErrorResponse {
            code: self.status_code().as_u16(),
            name: self.error_name(),
            message: self.to_string(),
            errors,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field-level failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub developer_message: String,
}

/// Input validation failure with per-field details
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Build from a list of field errors
    pub fn from_fields(errors: Vec<FieldError>) -> Self {
        let message = match errors.as_slice() {
            [single] => single.message.clone(),
            _ => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                format!("Validation failed for fields: {}", fields.join(", "))
            }
        };
        Self { message, errors }
    }

    /// A single field failure
    pub fn field(
        field: impl Into<String>,
        value: impl Into<Value>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let kind = kind.into();
        let message = message.into();
        let developer_message = format!("{} failed '{}' validation: {}", field, kind, message);
        Self::from_fields(vec![FieldError {
            field,
            value: value.into(),
            kind,
            message,
            developer_message,
        }])
    }

    /// A malformed query string parameter
    pub fn query(param: &str, value: &str, message: impl Into<String>) -> Self {
        Self::field(param, value, "syntax", message)
    }

    /// A query referenced a field the resource does not expose
    pub fn unknown_field(param: &str, field: &str, resource: &str) -> Self {
        Self::field(
            param,
            field,
            "unknown_field",
            format!("Unknown field '{}' for {}", field, resource),
        )
    }

    /// Names of the failing fields
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Query or write execution error
    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    /// Data integrity error
    #[error("Data integrity error: {message}")]
    IntegrityError { message: String },

    /// Backend not available
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        AdminError::Internal(format!("serialization failed: {}", err))
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for admin operations
pub type AdminResult<T> = Result<T, AdminError>;
