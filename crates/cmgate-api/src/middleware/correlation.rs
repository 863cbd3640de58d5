//! Correlation id propagation.
//!
//! The id is assigned by `SetRequestIdLayer` (inbound `X-Correlation-ID` or a
//! fresh UUID) and echoed by `PropagateRequestIdLayer`. This middleware makes
//! it available to the rest of the request as a task-local, so response
//! envelopes built anywhere below it (error conversions included) carry the
//! same token.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Header carrying the correlation id on requests and responses.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

tokio::task_local! {
    static CORRELATION_ID: String;
}

#[must_use]
pub fn correlation_header() -> HeaderName {
    HeaderName::from_static(CORRELATION_ID_HEADER)
}

/// Assigns an id to requests that arrive without one.
#[must_use]
pub fn set_correlation_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(correlation_header(), MakeRequestUuid)
}

/// Copies the request's id onto the response.
#[must_use]
pub fn propagate_correlation_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(correlation_header())
}

/// Id of the request being served, or an empty string outside a request.
#[must_use]
pub fn current_correlation_id() -> String {
    CORRELATION_ID.try_with(Clone::clone).unwrap_or_default()
}

/// Reads the id from request extensions, then the header.
pub fn correlation_id_of<B>(request: &axum::http::Request<B>) -> Option<String> {
    request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| request.headers().get(CORRELATION_ID_HEADER))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Runs the rest of the stack inside the request's correlation scope.
pub async fn correlation_scope(mut request: Request<Body>, next: Next) -> Response {
    let id = match correlation_id_of(&request) {
        Some(id) => id,
        None => {
            // blank inbound header
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request
                    .headers_mut()
                    .insert(correlation_header(), value.clone());
                request.extensions_mut().insert(RequestId::new(value));
            }
            id
        }
    };

    let mut response = CORRELATION_ID.scope(id.clone(), next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(correlation_header(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_scope_is_empty() {
        assert_eq!(current_correlation_id(), "");
    }

    #[tokio::test]
    async fn test_scope_exposes_id() {
        let seen = CORRELATION_ID
            .scope("abc-123".to_string(), async { current_correlation_id() })
            .await;
        assert_eq!(seen, "abc-123");
    }

    #[test]
    fn test_blank_header_is_ignored() {
        let request = axum::http::Request::builder()
            .header(CORRELATION_ID_HEADER, "  ")
            .body(())
            .unwrap();
        assert_eq!(correlation_id_of(&request), None);

        let request = axum::http::Request::builder()
            .header(CORRELATION_ID_HEADER, "token-1")
            .body(())
            .unwrap();
        assert_eq!(correlation_id_of(&request).as_deref(), Some("token-1"));
    }
}
