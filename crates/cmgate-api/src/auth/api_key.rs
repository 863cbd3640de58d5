//! API key scheme.
//!
//! Keys are configured as `key -> client name`. Only SHA-256 digests of the
//! keys are held in memory and presented keys are looked up by digest.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use super::{AuthOutcome, AuthType, Principal, Role};

/// Request header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Default)]
pub struct ApiKeyStore {
    clients_by_digest: HashMap<String, String>,
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("keys", &self.clients_by_digest.len())
            .finish()
    }
}

fn digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

impl ApiKeyStore {
    /// Builds the store from `(key, client name)` pairs. Blank keys are skipped.
    pub fn from_keys(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        let clients_by_digest = keys
            .into_iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, client)| (digest(key.trim()), client))
            .collect();
        Self { clients_by_digest }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients_by_digest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients_by_digest.is_empty()
    }

    pub fn authenticate(&self, headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> AuthOutcome {
        let Some(presented) = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            return AuthOutcome::NoSchemeMatched;
        };

        match self.clients_by_digest.get(&digest(presented)) {
            Some(client) => {
                tracing::debug!(client = %client, "API key accepted");
                AuthOutcome::Authenticated(Principal {
                    name: client.clone(),
                    auth_type: AuthType::ApiKey,
                    role: Role::ApiClient,
                })
            }
            None => {
                let remote = remote_addr.map_or_else(|| "unknown".to_string(), |a| a.ip().to_string());
                tracing::warn!(remote_addr = %remote, "Rejected unknown API key");
                AuthOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store() -> ApiKeyStore {
        ApiKeyStore::from_keys([
            ("key-123".to_string(), "osd-runner".to_string()),
            ("   ".to_string(), "blank".to_string()),
        ])
    }

    fn with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_blank_keys_are_not_registered() {
        assert_eq!(store().len(), 1);
    }

    #[test]
    fn test_known_key() {
        match store().authenticate(&with_key("key-123"), None) {
            AuthOutcome::Authenticated(p) => assert_eq!(p.name, "osd-runner"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let addr: SocketAddr = "10.0.0.5:50123".parse().unwrap();
        assert_eq!(
            store().authenticate(&with_key("key-124"), Some(addr)),
            AuthOutcome::Rejected
        );
    }

    #[test]
    fn test_missing_or_blank_header_matches_nothing() {
        assert_eq!(
            store().authenticate(&HeaderMap::new(), None),
            AuthOutcome::NoSchemeMatched
        );
        assert_eq!(
            store().authenticate(&with_key("  "), None),
            AuthOutcome::NoSchemeMatched
        );
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", store());
        assert!(!rendered.contains("key-123"));
    }
}
