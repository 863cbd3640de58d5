//! Error Types
//!
//! One taxonomy is shared by the management plane, the directory plane and the
//! domain services. The HTTP edge is the only place that turns these into
//! status codes.
//!
//! # Example
//!
//! ```
//! use cmgate_core::{CmgateError, Result};
//!
//! fn find_computer(name: &str) -> Result<i64> {
//!     Err(CmgateError::not_found("Computer", name))
//! }
//!
//! let err = find_computer("PC01").unwrap_err();
//! assert_eq!(err.to_string(), "Computer not found: PC01");
//! assert!(err.is_not_found());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized error type for cmgate.
///
/// `NotFound` and `Unavailable` are deliberately separate: a lookup that
/// reached the plane and found nothing is never reported the same way as a
/// plane that could not be reached.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CmgateError {
    /// Named entity absent in the queried plane. Maps to HTTP 404.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// Kind of entity, e.g. "Computer" or "Collection"
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Duplicate create rejected by the plane.
    #[error("{resource} already exists: {id}")]
    AlreadyExists { resource: String, id: String },

    /// The plane returned a non-zero or failure status for a command.
    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// Credential missing or invalid. Maps to HTTP 401.
    #[error("Unauthorized{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Malformed input. Maps to HTTP 400.
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    /// The plane could not be reached or the transport failed.
    #[error("{plane} unavailable: {message}")]
    Unavailable { plane: String, message: String },

    /// Anything else, including a panicked or cancelled worker.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CmgateError {
    /// Shorthand for a `NotFound` with an identifier.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn already_exists(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn operation_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(plane: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            plane: plane.into(),
            message: message.into(),
        }
    }

    /// Machine-readable code used in logs and response envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::OperationFailed { .. } => "operation_failed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Unavailable { .. } => "unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Type alias for Results using `CmgateError`.
pub type Result<T> = std::result::Result<T, CmgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = CmgateError::not_found("Collection", "ABC00012");
        assert_eq!(error.to_string(), "Collection not found: ABC00012");

        let error = CmgateError::NotFound {
            resource: "Migration association".to_string(),
            id: None,
        };
        assert_eq!(error.to_string(), "Migration association not found");
    }

    #[test]
    fn test_unauthorized_display() {
        let error = CmgateError::Unauthorized { message: None };
        assert_eq!(error.to_string(), "Unauthorized");

        let error = CmgateError::Unauthorized {
            message: Some("Invalid API key".to_string()),
        };
        assert_eq!(error.to_string(), "Unauthorized: Invalid API key");
    }

    #[test]
    fn test_error_codes_are_distinct_for_absent_and_unreachable() {
        let absent = CmgateError::not_found("Computer", "PC01");
        let down = CmgateError::unavailable("management plane", "connection refused");
        assert_ne!(absent.error_code(), down.error_code());
        assert!(absent.is_not_found());
        assert!(!down.is_not_found());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let error = CmgateError::invalid_argument("computerName", "must not be empty");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "invalid_argument");
        assert_eq!(json["field"], "computerName");
    }

    #[test]
    fn test_is_std_error() {
        let error = CmgateError::Internal("worker panicked".to_string());
        let _: &dyn std::error::Error = &error;
    }
}
