//! Directory-plane connection settings.

use secrecy::SecretString;
use url::Url;

use crate::error::{GraphError, GraphResult};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/beta/";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// App-registration credentials and endpoints for one tenant.
#[derive(Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Versioned Graph base, e.g. `https://graph.microsoft.com/beta/`.
    pub graph_url: String,
    pub authority_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("graph_url", &self.graph_url)
            .field("authority_url", &self.authority_url)
            .finish()
    }
}

impl GraphConfig {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: SecretString) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret,
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(GraphError::Config("tenant_id is required".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(GraphError::Config("client_id is required".to_string()));
        }
        self.base_url()?;
        Ok(())
    }

    /// Graph base URL, normalized to end with `/` so relative paths join under it.
    pub fn base_url(&self) -> GraphResult<Url> {
        let raw = if self.graph_url.ends_with('/') {
            self.graph_url.clone()
        } else {
            format!("{}/", self.graph_url)
        };
        Ok(Url::parse(&raw)?)
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Client-credentials scope: the Graph origin plus `/.default`.
    pub fn scope(&self) -> GraphResult<String> {
        let base = self.base_url()?;
        Ok(format!("{}.default", base.join("/")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GraphConfig {
        GraphConfig::new("contoso-tenant", "app-id", SecretString::from("s3cret".to_string()))
    }

    #[test]
    fn test_defaults() {
        let cfg = config();
        assert_eq!(cfg.base_url().unwrap().as_str(), DEFAULT_GRAPH_URL);
        assert_eq!(
            cfg.token_url(),
            "https://login.microsoftonline.com/contoso-tenant/oauth2/v2.0/token"
        );
        assert_eq!(cfg.scope().unwrap(), "https://graph.microsoft.com/.default");
    }

    #[test]
    fn test_graph_url_without_trailing_slash() {
        let mut cfg = config();
        cfg.graph_url = "https://graph.microsoft.com/v1.0".to_string();
        assert_eq!(
            cfg.base_url().unwrap().join("users").unwrap().as_str(),
            "https://graph.microsoft.com/v1.0/users"
        );
    }

    #[test]
    fn test_validate_requires_ids() {
        let mut cfg = config();
        cfg.tenant_id = String::new();
        assert!(matches!(cfg.validate(), Err(GraphError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", config()).contains("s3cret"));
    }
}
