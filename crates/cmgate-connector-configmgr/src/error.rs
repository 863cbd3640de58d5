//! Error types for management providers.

use cmgate_core::CmgateError;
use thiserror::Error;

/// Result type alias using `ProviderError`.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors a [`crate::ManagementProvider`] can report.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, transport or credential failure reaching the site.
    #[error("site unreachable: {0}")]
    Unreachable(String),

    /// The site rejected a create because the instance already exists.
    #[error("instance already exists: {0}")]
    AlreadyExists(String),

    /// An instance path did not resolve.
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// Unknown class or malformed query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A WMI method call raised an error.
    #[error("{class}.{method} failed: {message}")]
    MethodFailed {
        class: String,
        method: String,
        message: String,
    },

    /// A row is missing a property, or it has the wrong type.
    #[error("property '{property}' missing or not {expected}")]
    Property {
        property: String,
        expected: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

const PLANE: &str = "management plane";

impl From<ProviderError> for CmgateError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unreachable(message) => CmgateError::unavailable(PLANE, message),
            ProviderError::Http(e) => CmgateError::unavailable(PLANE, e.to_string()),
            ProviderError::AlreadyExists(id) => CmgateError::already_exists("Instance", id),
            ProviderError::InstanceNotFound(id) => CmgateError::not_found("Instance", id),
            ProviderError::InvalidQuery(message) => CmgateError::invalid_argument("query", message),
            ProviderError::MethodFailed {
                class,
                method,
                message,
            } => CmgateError::operation_failed(format!("{class}.{method}"), message),
            other @ (ProviderError::Property { .. }
            | ProviderError::Json(_)
            | ProviderError::Url(_)) => CmgateError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_is_not_not_found() {
        let err: CmgateError = ProviderError::Unreachable("timed out".into()).into();
        assert!(matches!(err, CmgateError::Unavailable { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_method_failure_maps_to_operation_failed() {
        let err: CmgateError = ProviderError::MethodFailed {
            class: "SMS_Collection".into(),
            method: "AddMembershipRule".into(),
            message: "Generic failure".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "SMS_Collection.AddMembershipRule failed: Generic failure"
        );
    }
}
