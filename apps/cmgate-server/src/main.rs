//! cmgate server
//!
//! REST facade over a ConfigMgr site and Microsoft Graph.
//!
//! Configuration comes from `CMGATE_CONFIG` (default `./config/cmgate.yaml`)
//! with `CMGATE_*` overrides; `CMGATE_SECRET_KEY` unlocks `enc:` secrets.

mod bootstrap;
mod config;
mod health;
mod logging;

use anyhow::Context;
use cmgate_api::{api_router, with_http_layers, ApiState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::{CmgateConfig, SECRET_KEY_VAR};
use crate::health::{health_routes, HealthState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CmgateConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging.level)?;

    let secret_key = std::env::var(SECRET_KEY_VAR).ok();
    let plane = Arc::new(
        bootstrap::build_management_plane(&config.configmgr, secret_key.as_deref()).await?,
    );
    let directory =
        bootstrap::build_directory_plane(&config.graph, secret_key.as_deref())?.map(Arc::new);
    let authenticator = bootstrap::build_authenticator(&config.authentication)?;

    let health = Arc::new(HealthState::new(plane.provider_kind(), directory.is_some()));
    let state = ApiState::new(
        plane.clone(),
        directory,
        config.configmgr.domain_short_name.clone(),
        authenticator,
    );

    let mut app = with_http_layers(health_routes(health).merge(api_router(state)));
    if config.server.cors_allow_any_origin {
        warn!("CORS allows any origin");
        app = app.layer(CorsLayer::permissive());
    }

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.bind_address()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;
    info!(address = %addr, "cmgate listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // The router and its services are gone; release the provider.
    match Arc::try_unwrap(plane) {
        Ok(client) => client.shutdown().await,
        Err(_) => warn!("Management plane still referenced at shutdown"),
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
