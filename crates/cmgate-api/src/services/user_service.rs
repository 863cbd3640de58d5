//! Primary users (user-device affinity) on the management plane.
//!
//! Bare account names are qualified with the configured NetBIOS domain
//! before they reach the site, so `jdoe` and `CONTOSO\jdoe` name the same
//! user. UPNs and already-qualified names pass through unchanged.

use cmgate_connector_configmgr::{operations::PrimaryUserChanges, ManagementPlaneClient};
use cmgate_core::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct UserService {
    plane: Arc<ManagementPlaneClient>,
    domain_short_name: Option<String>,
}

impl UserService {
    pub fn new(plane: Arc<ManagementPlaneClient>, domain_short_name: Option<String>) -> Self {
        Self {
            plane,
            domain_short_name: domain_short_name.filter(|d| !d.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn qualify(&self, user_name: &str) -> String {
        let user_name = user_name.trim();
        match &self.domain_short_name {
            Some(domain) if !user_name.contains('\\') && !user_name.contains('@') => {
                format!("{domain}\\{user_name}")
            }
            _ => user_name.to_string(),
        }
    }

    pub async fn primary_users(&self, computer_name: &str) -> Result<Vec<String>> {
        self.plane
            .get_primary_users(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Failed to read primary users"))
    }

    pub async fn add_primary_user(&self, computer_name: &str, user_name: &str) -> Result<()> {
        let account = self.qualify(user_name);
        self.plane
            .set_primary_user(computer_name, &account)
            .await
            .inspect_err(|e| {
                warn!(computer_name, user = %account, error = %e, "Failed to add primary user");
            })?;
        info!(computer_name, user = %account, "Primary user added");
        Ok(())
    }

    /// Completes without change when no affinity on the device matches.
    pub async fn remove_primary_user(&self, computer_name: &str, user_name: &str) -> Result<()> {
        let removed = self
            .plane
            .delete_primary_user(computer_name, user_name)
            .await
            .inspect_err(|e| {
                warn!(computer_name, user_name, error = %e, "Failed to remove primary user");
            })?;
        info!(computer_name, user_name, removed, "Primary user removal completed");
        Ok(())
    }

    /// Makes the administrator-assigned primary users exactly `user_names`.
    /// Names differing only in case count once.
    pub async fn replace_primary_users(
        &self,
        computer_name: &str,
        user_names: &[String],
    ) -> Result<PrimaryUserChanges> {
        let accounts: Vec<String> = user_names.iter().map(|u| self.qualify(u)).collect();
        let changes = self
            .plane
            .replace_primary_users(computer_name, accounts)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Failed to replace primary users"))?;
        info!(
            computer_name,
            added = changes.added.len(),
            removed = changes.removed.len(),
            "Primary users replaced"
        );
        Ok(changes)
    }
}
