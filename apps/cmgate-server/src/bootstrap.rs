//! Builds the plane clients and the authentication gate from configuration.

use anyhow::Context;
use cmgate_api::{ApiKeyStore, Authenticator, Negotiator, TrustedHeaderNegotiator};
use cmgate_connector_configmgr::{
    AdminServiceConfig, AdminServiceProvider, InMemoryProvider, ManagementPlaneClient,
    ManagementProvider,
};
use cmgate_connector_graph::{DirectoryPlaneClient, GraphConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{
    resolve_secret, AuthenticationConfig, ConfigMgrConfig, GraphSettings, ProviderKind,
};

/// Connects the management plane.
///
/// The AdminService provider holds a blocking HTTP client, so it is built on
/// the blocking pool.
pub async fn build_management_plane(
    config: &ConfigMgrConfig,
    secret_key: Option<&str>,
) -> anyhow::Result<ManagementPlaneClient> {
    let provider: Arc<dyn ManagementProvider> = match config.provider {
        ProviderKind::InMemory => {
            warn!(site_code = %config.site_code, "Using the simulated in-memory site");
            Arc::new(InMemoryProvider::new(&config.site_code))
        }
        ProviderKind::AdminService => {
            let password = config
                .password
                .as_deref()
                .map(|raw| resolve_secret("configmgr.password", raw, secret_key))
                .transpose()?;
            let admin_config = AdminServiceConfig {
                site_server: config.site_server.clone().unwrap_or_default(),
                username: config.username.clone(),
                password,
                accept_invalid_certs: config.accept_invalid_certs,
                timeout_secs: config.timeout_secs,
            };
            let provider = tokio::task::spawn_blocking(move || AdminServiceProvider::connect(admin_config))
                .await
                .context("AdminService provider task failed")?
                .context("Failed to create AdminService provider")?;
            Arc::new(provider)
        }
    };

    info!(
        provider = provider.kind(),
        site_server = config.site_server.as_deref().unwrap_or("-"),
        primary_user_variable = %config.primary_user_variable,
        "Management plane configured"
    );
    Ok(ManagementPlaneClient::new(provider))
}

/// Builds the Graph client, or `None` when the directory plane is disabled.
pub fn build_directory_plane(
    config: &GraphSettings,
    secret_key: Option<&str>,
) -> anyhow::Result<Option<DirectoryPlaneClient>> {
    if !config.enabled {
        info!("Directory plane disabled; Entra and Intune endpoints will fail");
        return Ok(None);
    }

    let client_secret = resolve_secret("graph.client_secret", &config.client_secret, secret_key)?;
    let mut graph_config = GraphConfig::new(&config.tenant_id, &config.client_id, client_secret);
    graph_config.graph_url = config.graph_url.clone();
    graph_config.authority_url = config.authority_url.clone();
    graph_config.timeout_secs = config.timeout_secs;

    let client = DirectoryPlaneClient::new(graph_config).context("Failed to create Graph client")?;
    info!(
        tenant_id = %config.tenant_id,
        app = config.app_display_name.as_deref().unwrap_or("-"),
        "Directory plane configured"
    );
    Ok(Some(client))
}

/// Combines the enabled schemes. With neither enabled every request is refused.
pub fn build_authenticator(config: &AuthenticationConfig) -> anyhow::Result<Authenticator> {
    let api_keys = if config.enable_api_key_authentication {
        let store = ApiKeyStore::from_keys(
            config
                .api_keys
                .iter()
                .map(|(key, client)| (key.clone(), client.clone())),
        );
        if store.is_empty() {
            warn!("API key authentication enabled but no keys are configured");
        }
        Some(store)
    } else {
        None
    };

    let negotiator: Option<Arc<dyn Negotiator>> = match (
        config.enable_windows_authentication,
        config.trusted_identity_header.as_deref(),
    ) {
        (true, Some(header)) => Some(Arc::new(
            TrustedHeaderNegotiator::new(header).context("Invalid trusted_identity_header")?,
        )),
        (true, None) => {
            warn!("Windows authentication enabled but trusted_identity_header is not set; scheme disabled");
            None
        }
        (false, _) => None,
    };

    let authenticator = Authenticator::new(api_keys, negotiator);
    if !authenticator.any_scheme_enabled() {
        warn!("No authentication scheme is enabled; every API request will be refused");
    }
    Ok(authenticator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn auth_config(windows: bool, api_key: bool, header: Option<&str>) -> AuthenticationConfig {
        AuthenticationConfig {
            enable_windows_authentication: windows,
            enable_api_key_authentication: api_key,
            api_keys: HashMap::from([("key-123".to_string(), "osd-runner".to_string())]),
            trusted_identity_header: header.map(str::to_string),
        }
    }

    #[test]
    fn test_windows_without_header_is_disabled() {
        let authenticator = build_authenticator(&auth_config(true, false, None)).unwrap();
        assert!(!authenticator.any_scheme_enabled());
    }

    #[test]
    fn test_both_schemes() {
        let authenticator =
            build_authenticator(&auth_config(true, true, Some("X-Remote-User"))).unwrap();
        assert!(authenticator.any_scheme_enabled());
    }

    #[test]
    fn test_invalid_identity_header() {
        assert!(build_authenticator(&auth_config(true, false, Some("bad header"))).is_err());
    }

    #[test]
    fn test_disabled_directory_plane() {
        assert!(build_directory_plane(&GraphSettings::default(), None)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_in_memory_plane() {
        let plane = build_management_plane(&ConfigMgrConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(plane.provider_kind(), "in_memory");
        assert_eq!(plane.site_code().await.unwrap(), "PS1");
    }
}
