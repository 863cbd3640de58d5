//! Error types for the cmgate REST edge.
//!
//! This is the only place domain errors become HTTP statuses. The mapping
//! looks at the error kind alone:
//!
//! | Kind              | Status |
//! |-------------------|--------|
//! | invalid argument  | 400    |
//! | already exists    | 400    |
//! | unauthorized      | 401    |
//! | not found         | 404    |
//! | anything else     | 500    |

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use cmgate_core::CmgateError;

use crate::response::ApiResponse;

pub const MSG_INVALID_REQUEST: &str = "Invalid request parameters";
pub const MSG_ALREADY_EXISTS: &str = "Invalid request or computer already exists";
pub const MSG_UNAUTHORIZED: &str = "Unauthorized access";
pub const MSG_OPERATION_FAILED: &str = "Operation failed";
pub const MSG_INTERNAL: &str = "An internal server error occurred";

/// Error type for the REST edge.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A domain error raised by a service or plane client.
    #[error(transparent)]
    Domain(#[from] CmgateError),

    /// Request body or parameters failed validation.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// No enabled scheme authenticated the caller. `negotiate` adds the
    /// `WWW-Authenticate: Negotiate` challenge.
    #[error("Unauthorized")]
    Unauthorized { negotiate: bool },
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Domain(e) => match e {
                CmgateError::InvalidArgument { .. } | CmgateError::AlreadyExists { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CmgateError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
                CmgateError::NotFound { .. } => StatusCode::NOT_FOUND,
                CmgateError::OperationFailed { .. }
                | CmgateError::Unavailable { .. }
                | CmgateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Envelope message and error list.
    fn body(&self) -> (String, Vec<String>) {
        match self {
            Self::Validation(errors) => (MSG_INVALID_REQUEST.to_string(), errors.clone()),
            Self::Unauthorized { .. } => (MSG_UNAUTHORIZED.to_string(), Vec::new()),
            Self::Domain(e) => match e {
                CmgateError::InvalidArgument { field, message } => (
                    MSG_INVALID_REQUEST.to_string(),
                    vec![format!("{field}: {message}")],
                ),
                CmgateError::AlreadyExists { .. } => {
                    (MSG_ALREADY_EXISTS.to_string(), vec![e.to_string()])
                }
                CmgateError::Unauthorized { .. } => (MSG_UNAUTHORIZED.to_string(), Vec::new()),
                CmgateError::NotFound { resource, .. } => {
                    (format!("{resource} not found"), vec![e.to_string()])
                }
                CmgateError::OperationFailed { .. } => {
                    (MSG_OPERATION_FAILED.to_string(), vec![e.to_string()])
                }
                CmgateError::Unavailable { .. } | CmgateError::Internal(_) => {
                    (MSG_INTERNAL.to_string(), Vec::new())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let (message, errors) = self.body();
        let mut response = (status, ApiResponse::failure(message, errors)).into_response();
        if let Self::Unauthorized { negotiate: true } = self {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
        }
        response
    }
}

/// Result type for handlers: a status plus an envelope, or an [`ApiError`].
pub type ApiResult<T> = Result<(StatusCode, ApiResponse<T>), ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(error: ApiError) -> (StatusCode, Value, Option<String>) {
        let response = error.into_response();
        let status = response.status();
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap(), challenge)
    }

    #[tokio::test]
    async fn test_not_found_is_404_with_resource_message() {
        let (status, body, _) = render(CmgateError::not_found("Computer", "PC01").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Computer not found");
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0], "Computer not found: PC01");
    }

    #[tokio::test]
    async fn test_invalid_argument_and_duplicate_are_400() {
        let (status, body, _) =
            render(CmgateError::invalid_argument("biosGuid", "not a GUID").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], MSG_INVALID_REQUEST);
        assert_eq!(body["errors"][0], "biosGuid: not a GUID");

        let (status, body, _) = render(CmgateError::already_exists("Computer", "PC01").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], MSG_ALREADY_EXISTS);
    }

    #[tokio::test]
    async fn test_plane_failures_are_500() {
        let (status, body, _) =
            render(CmgateError::operation_failed("Refresh", "status 2").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], MSG_OPERATION_FAILED);

        let (status, body, _) =
            render(CmgateError::unavailable("ConfigMgr", "connection refused").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], MSG_INTERNAL);
        assert_eq!(body["errors"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unauthorized_challenge() {
        let (status, body, challenge) = render(ApiError::Unauthorized { negotiate: true }).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], MSG_UNAUTHORIZED);
        assert_eq!(challenge.as_deref(), Some("Negotiate"));

        let (_, _, challenge) = render(ApiError::Unauthorized { negotiate: false }).await;
        assert_eq!(challenge, None);
    }

    #[tokio::test]
    async fn test_validation_lists_every_error() {
        let (status, body, _) = render(ApiError::Validation(vec![
            "computerName: required".to_string(),
            "biosGuid: invalid".to_string(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }
}
