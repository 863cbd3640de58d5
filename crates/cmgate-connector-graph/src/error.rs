//! Error types for the directory-plane client.

use cmgate_core::CmgateError;
use thiserror::Error;

/// Result type alias using `GraphError`.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur when talking to Microsoft Graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Microsoft Graph API error.
    #[error("Graph API error ({status}): {code} - {message}")]
    GraphApi {
        status: u16,
        code: String,
        message: String,
        inner_error: Option<String>,
    },

    /// The addressed resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

const PLANE: &str = "Microsoft Graph";

impl From<GraphError> for CmgateError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Http(e) => CmgateError::unavailable(PLANE, e.to_string()),
            GraphError::Auth(message) => CmgateError::unavailable(PLANE, message),
            GraphError::NotFound(resource) => CmgateError::not_found("Graph resource", resource),
            GraphError::GraphApi { code, message, .. } => {
                CmgateError::operation_failed(format!("Graph {code}"), message)
            }
            other @ (GraphError::Config(_) | GraphError::Json(_) | GraphError::Url(_)) => {
                CmgateError::Internal(other.to_string())
            }
        }
    }
}
