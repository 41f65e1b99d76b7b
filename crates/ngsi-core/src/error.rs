//! Error types for the NGSI context model

use thiserror::Error;

/// Result type for model construction and mutation
pub type NgsiResult<T> = Result<T, NgsiError>;

/// Coarse classification of [`NgsiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    TypeCoercion,
    Shape,
    Enum,
    Precondition,
    Validation,
    Parse,
}

/// Errors raised while building or mutating NGSI models
#[derive(Debug, Error)]
pub enum NgsiError {
    /// A string field violates the naming pattern or its length bound
    #[error("invalid {field} '{value}': {reason}")]
    Format {
        field: String,
        value: String,
        reason: String,
    },

    /// A value cannot be cast to its declared type
    #[error("cannot coerce value to {target}: {reason}")]
    TypeCoercion { target: String, reason: String },

    /// A container (metadata, attribute set) has an unsupported shape
    #[error("invalid shape: {0}")]
    Shape(String),

    /// A closed-vocabulary field holds a value outside its enumeration
    #[error("invalid {field} '{value}', expected one of: {allowed}")]
    Enum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    /// Mutually exclusive arguments, or a reference to a missing attribute
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Model level validation (required attributes, custom rules, units)
    #[error("validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Malformed JSON text
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NgsiError {
    /// Create a format error for `field` holding `value`
    pub fn format(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a coercion error for the given target type
    pub fn coercion(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeCoercion {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create an enum error listing the allowed values
    pub fn enumeration(field: &'static str, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::Enum {
            field,
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            NgsiError::Format { .. } => ErrorKind::Format,
            NgsiError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            NgsiError::Shape(_) => ErrorKind::Shape,
            NgsiError::Enum { .. } => ErrorKind::Enum,
            NgsiError::Precondition(_) => ErrorKind::Precondition,
            NgsiError::Validation { .. } => ErrorKind::Validation,
            NgsiError::Json(_) => ErrorKind::Parse,
        }
    }
}
