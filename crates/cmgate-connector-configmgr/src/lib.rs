//! ConfigMgr management-plane connector for cmgate
//!
//! Translates device, collection, affinity and state-migration operations into
//! WQL queries and WMI method calls against a ConfigMgr site.
//!
//! # Layers
//!
//! - [`provider`] - the synchronous [`ManagementProvider`] seam every backend implements
//! - [`query`] - structured queries rendered to WQL or OData filters
//! - [`object`] - property-bag rows and instance paths exchanged with a provider
//! - [`mapping`] - the only place rows are read by property name
//! - [`operations`] - blocking domain operations over a provider
//! - [`client`] - [`ManagementPlaneClient`], which offloads each operation to the blocking pool
//!
//! # Providers
//!
//! - [`InMemoryProvider`] - a simulated site for tests and offline development
//! - [`AdminServiceProvider`] - the site's AdminService REST endpoint
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cmgate_connector_configmgr::{InMemoryProvider, ManagementPlaneClient};
//!
//! # async fn example() -> cmgate_core::Result<()> {
//! let client = ManagementPlaneClient::new(Arc::new(InMemoryProvider::new("PS1")));
//! assert!(!client.device_exists("PC01").await?);
//! # Ok(())
//! # }
//! ```

mod admin_service;
pub mod client;
mod error;
pub mod mapping;
mod memory;
pub mod object;
pub mod operations;
pub mod provider;
pub mod query;

pub use admin_service::{AdminServiceConfig, AdminServiceProvider};
pub use client::ManagementPlaneClient;
pub use error::{ProviderError, ProviderResult};
pub use memory::InMemoryProvider;
pub use object::{InstancePath, PlaneObject};
pub use provider::ManagementProvider;
pub use query::{Filter, QueryValue, WqlQuery};
