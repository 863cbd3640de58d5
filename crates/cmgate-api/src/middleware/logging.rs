//! Request logging and the per-request trace span.

use axum::{body::Body, extract::Request, http::Response, middleware::Next};
use std::time::{Duration, Instant};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{error, info, warn, Span};

use super::correlation::correlation_id_of;

/// Span factory that records the correlation id next to method and path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationSpan;

impl<B> MakeSpan<B> for CorrelationSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let correlation_id = correlation_id_of(request).unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            correlation_id = %correlation_id,
        )
    }
}

/// `TraceLayer` whose spans carry the correlation id. Must sit inside the
/// layer that assigns the id.
#[must_use]
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, CorrelationSpan> {
    TraceLayer::new_for_http().make_span_with(CorrelationSpan)
}

/// Logs the start and completion of every request. The completion level
/// follows the status: 5xx is an error, 4xx a warning.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    info!(%method, %path, "request started");
    let response = next.run(request).await;
    log_completion(method.as_str(), &path, response.status().as_u16(), started.elapsed());
    response
}

fn log_completion(method: &str, path: &str, status: u16, elapsed: Duration) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match status {
        500..=u16::MAX => error!(method, path, status, elapsed_ms, "request completed"),
        400..=499 => warn!(method, path, status, elapsed_ms, "request completed"),
        _ => info!(method, path, status, elapsed_ms, "request completed"),
    }
}
