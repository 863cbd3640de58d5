//! REST edge for cmgate
//!
//! Exposes the management plane (ConfigMgr) and the directory plane
//! (Microsoft Graph) as a JSON API under `/api/v1`.
//!
//! - [`router`] - entity routers and the HTTP layer stack
//! - [`auth`] - API key and Windows negotiate authentication
//! - [`services`] - domain services over the plane clients
//! - [`response`] - the `{success, data, message, errors, correlationId, timestamp}` envelope
//! - [`error`] - mapping from domain errors to status codes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cmgate_api::{api_router, with_http_layers, ApiKeyStore, ApiState, Authenticator};
//! use cmgate_connector_configmgr::{InMemoryProvider, ManagementPlaneClient};
//!
//! let plane = Arc::new(ManagementPlaneClient::new(Arc::new(InMemoryProvider::new("PS1"))));
//! let keys = ApiKeyStore::from_keys([("secret".to_string(), "osd".to_string())]);
//! let state = ApiState::new(plane, None, None, Authenticator::new(Some(keys), None));
//! let app = with_http_layers(api_router(state));
//! # let _ = app;
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod router;
pub mod services;

pub use auth::{
    ApiKeyStore, AuthLayer, AuthType, Authenticator, Negotiator, Principal, Role,
    TrustedHeaderNegotiator, API_KEY_HEADER,
};
pub use error::{ApiError, ApiResult};
pub use middleware::CORRELATION_ID_HEADER;
pub use response::ApiResponse;
pub use router::{api_router, with_http_layers, ApiState};
