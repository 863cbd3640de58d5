//! Response envelope shared by every endpoint.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::current_correlation_id;

/// Uniform JSON body: `{success, data, message, errors, correlationId, timestamp}`.
///
/// `data` is left out entirely when there is nothing to return.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
    pub errors: Vec<String>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::build(true, Some(data), message.into(), Vec::new())
    }

    fn build(success: bool, data: Option<T>, message: String, errors: Vec<String>) -> Self {
        Self {
            success,
            data,
            message,
            errors,
            correlation_id: current_correlation_id(),
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self::build(true, None, message.into(), Vec::new())
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self::build(false, None, message.into(), errors)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_only_omits_data() {
        let body = serde_json::to_value(ApiResponse::message("Computer added successfully")).unwrap();
        assert_eq!(body["success"], json!(true));
        assert!(body.get("data").is_none());
        assert_eq!(body["errors"], json!([]));
        assert!(body.get("correlationId").is_some());
        assert!(body.get("timestamp").is_some());
    }

    #[test]
    fn test_failure_carries_errors() {
        let body = serde_json::to_value(ApiResponse::failure(
            "Invalid request parameters",
            vec!["computerName: must not be empty".to_string()],
        ))
        .unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errors"][0], json!("computerName: must not be empty"));
    }

    #[test]
    fn test_data_is_serialized_camel_case() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            computer_name: &'static str,
        }
        let body = serde_json::to_value(ApiResponse::ok(Payload { computer_name: "PC01" }, "ok")).unwrap();
        assert_eq!(body["data"]["computerName"], json!("PC01"));
    }
}
