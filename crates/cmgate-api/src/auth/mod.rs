//! Authentication gate.
//!
//! Two schemes can be enabled independently and are combined with OR:
//!
//! - API key, from the `X-API-Key` header ([`ApiKeyStore`])
//! - Windows negotiate, delegated to a pluggable [`Negotiator`]
//!
//! The API key is checked first. A key that is present but unknown rejects
//! the request outright; the negotiate scheme is only consulted when no key
//! was sent. With no scheme enabled every request is refused.

pub mod api_key;
pub mod layer;
pub mod negotiate;

pub use api_key::{ApiKeyStore, API_KEY_HEADER};
pub use layer::{AuthLayer, AuthService};
pub use negotiate::{Negotiator, TrustedHeaderNegotiator};

use axum::http::HeaderMap;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthType {
    ApiKey,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    ApiClient,
    WindowsUser,
}

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub name: String,
    pub auth_type: AuthType,
    pub role: Role,
}

/// Result of one scheme looking at a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    /// Credentials were presented and are wrong.
    Rejected,
    /// The scheme found nothing to check.
    NoSchemeMatched,
}

/// Combined policy over the enabled schemes.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    api_keys: Option<ApiKeyStore>,
    negotiator: Option<Arc<dyn Negotiator>>,
}

impl Authenticator {
    /// `None` disables a scheme.
    pub fn new(api_keys: Option<ApiKeyStore>, negotiator: Option<Arc<dyn Negotiator>>) -> Self {
        Self {
            api_keys,
            negotiator,
        }
    }

    #[must_use]
    pub fn any_scheme_enabled(&self) -> bool {
        self.api_keys.is_some() || self.negotiator.is_some()
    }

    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Principal, ApiError> {
        if !self.any_scheme_enabled() {
            tracing::warn!("No authentication scheme is enabled, refusing request");
            return Err(ApiError::Unauthorized { negotiate: false });
        }

        if let Some(store) = &self.api_keys {
            match store.authenticate(headers, remote_addr) {
                AuthOutcome::Authenticated(principal) => return Ok(principal),
                AuthOutcome::Rejected => return Err(ApiError::Unauthorized { negotiate: false }),
                AuthOutcome::NoSchemeMatched => {}
            }
        }

        match &self.negotiator {
            Some(negotiator) => match negotiator.negotiate(headers).await {
                AuthOutcome::Authenticated(principal) => Ok(principal),
                AuthOutcome::Rejected | AuthOutcome::NoSchemeMatched => {
                    Err(ApiError::Unauthorized { negotiate: true })
                }
            },
            None => Err(ApiError::Unauthorized { negotiate: false }),
        }
    }
}
