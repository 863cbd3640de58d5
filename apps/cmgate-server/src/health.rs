//! Unauthenticated liveness endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct HealthState {
    pub start_time: Instant,
    pub version: &'static str,
    /// Management provider label, e.g. `admin_service`.
    pub provider: &'static str,
    pub directory_enabled: bool,
}

impl HealthState {
    pub fn new(provider: &'static str, directory_enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
            provider,
            directory_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub provider: &'static str,
    pub directory_enabled: bool,
}

pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: state.version,
        uptime_secs: state.start_time.elapsed().as_secs(),
        provider: state.provider,
        directory_enabled: state.directory_enabled,
    })
}
