//! Microsoft Graph directory-plane client for cmgate
//!
//! Covers the Entra ID and Intune calls the gateway makes: object id lookups,
//! group membership by reference link, managed-device primary user,
//! co-management state and device category.
//!
//! Authentication is the OAuth2 client-credentials flow. The token is cached
//! until five minutes before expiry, and a 401 from Graph triggers one renewal
//! and retry.
//!
//! # Example
//!
//! ```no_run
//! use cmgate_connector_graph::{DirectoryPlaneClient, GraphConfig};
//! use secrecy::SecretString;
//!
//! # async fn example() -> cmgate_core::Result<()> {
//! let config = GraphConfig::new("tenant-id", "client-id", SecretString::from("secret".to_string()));
//! let directory = DirectoryPlaneClient::new(config)?;
//! if let Some(group_id) = directory.get_group_id_by_name("Autopilot Devices").await? {
//!     println!("group {group_id}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod graph_client;
pub mod models;

pub use auth::TokenCache;
pub use config::{GraphConfig, DEFAULT_AUTHORITY_URL, DEFAULT_GRAPH_URL};
pub use directory::DirectoryPlaneClient;
pub use error::{GraphError, GraphResult};
pub use graph_client::{odata_string, GraphClient, ListOptions};
