//! Windows negotiate scheme.
//!
//! The Kerberos/NTLM handshake itself happens outside this process. A
//! [`Negotiator`] only decides who the caller is from what that handshake left
//! on the request.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use cmgate_core::{CmgateError, Result};
use std::fmt::Debug;

use super::{AuthOutcome, AuthType, Principal, Role};

#[async_trait]
pub trait Negotiator: Send + Sync + Debug {
    async fn negotiate(&self, headers: &HeaderMap) -> AuthOutcome;
}

/// Trusts an identity header set by a fronting proxy that has already
/// completed negotiate authentication (for example `X-Remote-User`).
///
/// The proxy must strip this header from client requests.
#[derive(Debug, Clone)]
pub struct TrustedHeaderNegotiator {
    header: HeaderName,
}

impl TrustedHeaderNegotiator {
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.trim().as_bytes()).map_err(|e| {
            CmgateError::invalid_argument("trusted_identity_header", e.to_string())
        })?;
        Ok(Self { header })
    }
}

#[async_trait]
impl Negotiator for TrustedHeaderNegotiator {
    async fn negotiate(&self, headers: &HeaderMap) -> AuthOutcome {
        let identity = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match identity {
            Some(name) => AuthOutcome::Authenticated(Principal {
                name: name.to_string(),
                auth_type: AuthType::Windows,
                role: Role::WindowsUser,
            }),
            None => AuthOutcome::NoSchemeMatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_invalid_header_name() {
        assert!(TrustedHeaderNegotiator::new("bad header").is_err());
    }

    #[tokio::test]
    async fn test_identity_from_header() {
        let negotiator = TrustedHeaderNegotiator::new("X-Remote-User").unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(negotiator.negotiate(&headers).await, AuthOutcome::NoSchemeMatched);

        headers.insert("x-remote-user", HeaderValue::from_static("CONTOSO\\jdoe"));
        match negotiator.negotiate(&headers).await {
            AuthOutcome::Authenticated(p) => {
                assert_eq!(p.name, "CONTOSO\\jdoe");
                assert_eq!(p.role, Role::WindowsUser);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
