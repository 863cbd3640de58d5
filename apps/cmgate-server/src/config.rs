//! Server configuration loaded from a YAML file.
//!
//! Every section is optional and falls back to its defaults. A handful of
//! values can be overridden through `CMGATE_*` environment variables, and
//! secrets may be stored encrypted with an `enc:` prefix (see
//! [`resolve_secret`]).

use cmgate_connector_graph::{DEFAULT_AUTHORITY_URL, DEFAULT_GRAPH_URL};
use cmgate_core::SecretCipher;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "CMGATE_CONFIG";
/// Environment variable holding the passphrase for `enc:` secrets.
pub const SECRET_KEY_VAR: &str = "CMGATE_SECRET_KEY";
const DEFAULT_CONFIG_PATH: &str = "./config/cmgate.yaml";
const ENCRYPTED_PREFIX: &str = "enc:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required setting: {0}")]
    Missing(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmgateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub configmgr: ConfigMgrConfig,
    #[serde(default)]
    pub graph: GraphSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub authentication: AuthenticationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_any_origin: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Which management provider backs the ConfigMgr plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Simulated site, for tests and offline development.
    #[default]
    InMemory,
    AdminService,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigMgrConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub site_server: Option<String>,
    #[serde(default = "default_site_code")]
    pub site_code: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Plain text or `enc:`-prefixed.
    #[serde(default)]
    pub password: Option<String>,
    /// NetBIOS domain prepended to bare user names, e.g. `CONTOSO`.
    #[serde(default)]
    pub domain_short_name: Option<String>,
    /// Task sequence variable carrying user-device affinity during OSD.
    #[serde(default = "default_primary_user_variable")]
    pub primary_user_variable: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConfigMgrConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            site_server: None,
            site_code: default_site_code(),
            username: None,
            password: None,
            domain_short_name: None,
            primary_user_variable: default_primary_user_variable(),
            accept_invalid_certs: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_site_code() -> String {
    "PS1".to_string()
}

fn default_primary_user_variable() -> String {
    "SMSTSUDAUsers".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Microsoft Graph app registration.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    /// Plain text or `enc:`-prefixed.
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub app_display_name: Option<String>,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            app_display_name: None,
            graph_url: default_graph_url(),
            authority_url: default_authority_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.to_string()
}

fn default_authority_url() -> String {
    DEFAULT_AUTHORITY_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationConfig {
    #[serde(default = "default_true")]
    pub enable_windows_authentication: bool,
    #[serde(default = "default_true")]
    pub enable_api_key_authentication: bool,
    /// API key to client name.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    /// Header carrying the caller identity from a fronting negotiate proxy.
    /// Windows authentication stays off until this is set.
    #[serde(default)]
    pub trusted_identity_header: Option<String>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            enable_windows_authentication: true,
            enable_api_key_authentication: true,
            api_keys: HashMap::new(),
            trusted_identity_header: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl CmgateConfig {
    /// Loads from `CMGATE_CONFIG`, or `./config/cmgate.yaml` when unset, then
    /// applies environment overrides and validates.
    ///
    /// A missing file at the default path yields the defaults; a missing file
    /// named by `CMGATE_CONFIG` is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok().filter(|p| !p.trim().is_empty());
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies `CMGATE_*` overrides read through `lookup`. Unparsable numbers
    /// and booleans are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("CMGATE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CMGATE_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = lookup("CMGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(server) = lookup("CMGATE_SITE_SERVER") {
            self.configmgr.site_server = Some(server);
        }
        if let Some(code) = lookup("CMGATE_SITE_CODE") {
            self.configmgr.site_code = code;
        }
        if let Some(username) = lookup("CMGATE_CONFIGMGR_USERNAME") {
            self.configmgr.username = Some(username);
        }
        if let Some(password) = lookup("CMGATE_CONFIGMGR_PASSWORD") {
            self.configmgr.password = Some(password);
        }
        if let Some(enabled) = lookup("CMGATE_GRAPH_ENABLED").and_then(|v| v.parse().ok()) {
            self.graph.enabled = enabled;
        }
        if let Some(tenant_id) = lookup("CMGATE_GRAPH_TENANT_ID") {
            self.graph.tenant_id = tenant_id;
        }
        if let Some(client_id) = lookup("CMGATE_GRAPH_CLIENT_ID") {
            self.graph.client_id = client_id;
        }
        if let Some(secret) = lookup("CMGATE_GRAPH_CLIENT_SECRET") {
            self.graph.client_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "must be non-zero".to_string(),
            });
        }

        if self.configmgr.provider == ProviderKind::AdminService
            && is_blank(self.configmgr.site_server.as_deref())
        {
            return Err(ConfigError::Missing("configmgr.site_server".to_string()));
        }

        if self.graph.enabled {
            for (field, value) in [
                ("graph.tenant_id", &self.graph.tenant_id),
                ("graph.client_id", &self.graph.client_id),
                ("graph.client_secret", &self.graph.client_secret),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::Missing(field.to_string()));
                }
            }
        }
        Ok(())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Turns a configured secret into a [`SecretString`].
///
/// Values prefixed with `enc:` are decrypted with a [`SecretCipher`] keyed
/// from `secret_key`; anything else is taken literally.
pub fn resolve_secret(
    field: &str,
    raw: &str,
    secret_key: Option<&str>,
) -> Result<SecretString, ConfigError> {
    let Some(encrypted) = raw.strip_prefix(ENCRYPTED_PREFIX) else {
        return Ok(SecretString::from(raw.to_string()));
    };
    let key = secret_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::Missing(SECRET_KEY_VAR.to_string()))?;
    SecretCipher::new(key)
        .decrypt(encrypted)
        .map(SecretString::from)
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CmgateConfig::from_yaml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.configmgr.provider, ProviderKind::InMemory);
        assert_eq!(config.configmgr.primary_user_variable, "SMSTSUDAUsers");
        assert_eq!(config.graph.graph_url, "https://graph.microsoft.com/beta/");
        assert_eq!(config.graph.authority_url, "https://login.microsoftonline.com");
        assert_eq!(config.logging.level, "info");
        assert!(config.authentication.enable_windows_authentication);
        assert!(config.authentication.enable_api_key_authentication);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 5000
  cors_allow_any_origin: true

configmgr:
  provider: admin_service
  site_server: cm01.contoso.local
  site_code: P01
  username: CONTOSO\svc-cmgate
  password: hunter2
  domain_short_name: CONTOSO
  accept_invalid_certs: true

graph:
  enabled: true
  tenant_id: tenant
  client_id: client
  client_secret: secret
  app_display_name: cmgate

authentication:
  enable_windows_authentication: false
  api_keys:
    key-123: osd-runner
"#;
        let config = CmgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert!(config.server.cors_allow_any_origin);
        assert_eq!(config.configmgr.provider, ProviderKind::AdminService);
        assert_eq!(config.configmgr.site_code, "P01");
        assert_eq!(config.configmgr.domain_short_name.as_deref(), Some("CONTOSO"));
        assert!(config.graph.enabled);
        assert!(!config.authentication.enable_windows_authentication);
        assert_eq!(
            config.authentication.api_keys.get("key-123").map(String::as_str),
            Some("osd-runner")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let err = CmgateConfig::from_yaml("configmgr:\n  provider: wmi\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = CmgateConfig::from_yaml("server:\n  port: 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_admin_service_requires_site_server() {
        let config = CmgateConfig::from_yaml("configmgr:\n  provider: admin_service\n").unwrap();
        match config.validate() {
            Err(ConfigError::Missing(field)) => assert_eq!(field, "configmgr.site_server"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_graph_requires_credentials() {
        let config =
            CmgateConfig::from_yaml("graph:\n  enabled: true\n  tenant_id: t\n  client_id: c\n")
                .unwrap();
        match config.validate() {
            Err(ConfigError::Missing(field)) => assert_eq!(field, "graph.client_secret"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CmgateConfig::default();
        let vars: HashMap<&str, &str> = [
            ("CMGATE_PORT", "9443"),
            ("CMGATE_SITE_SERVER", "cm02.contoso.local"),
            ("CMGATE_GRAPH_ENABLED", "true"),
            ("CMGATE_HOST", "10.0.0.1"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.configmgr.site_server.as_deref(), Some("cm02.contoso.local"));
        assert!(config.graph.enabled);
    }

    #[test]
    fn test_unparsable_override_is_ignored() {
        let mut config = CmgateConfig::default();
        config.apply_overrides(|name| (name == "CMGATE_PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 7070\nlogging:\n  level: debug").unwrap();

        let config = CmgateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CmgateConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_plain_secret_passes_through() {
        let secret = resolve_secret("graph.client_secret", "s3cret", None).unwrap();
        assert_eq!(secret.expose_secret(), "s3cret");
    }

    #[test]
    fn test_encrypted_secret_is_decrypted() {
        let sealed = SecretCipher::new("passphrase").encrypt("s3cret").unwrap();
        let raw = format!("enc:{sealed}");

        let secret = resolve_secret("graph.client_secret", &raw, Some("passphrase")).unwrap();
        assert_eq!(secret.expose_secret(), "s3cret");

        assert!(matches!(
            resolve_secret("graph.client_secret", &raw, None),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            resolve_secret("graph.client_secret", &raw, Some("other")),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
