//! Entra ID group membership and Intune device operations.
//!
//! Names are resolved to Graph object ids here; a name that resolves to
//! nothing is `NotFound`. When Graph is not configured every call is
//! `Unavailable`.

use cmgate_connector_graph::DirectoryPlaneClient;
use cmgate_core::{bare_account_name, CmgateError, Result};
use std::sync::Arc;
use tracing::{info, warn};

const GRAPH_PLANE: &str = "Microsoft Graph";

#[derive(Debug, Clone)]
pub struct DirectoryService {
    directory: Option<Arc<DirectoryPlaneClient>>,
}

impl DirectoryService {
    pub fn new(directory: Arc<DirectoryPlaneClient>) -> Self {
        Self {
            directory: Some(directory),
        }
    }

    /// A service whose every operation reports the directory as unavailable.
    #[must_use]
    pub fn disabled() -> Self {
        Self { directory: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }

    fn client(&self) -> Result<&DirectoryPlaneClient> {
        self.directory
            .as_deref()
            .ok_or_else(|| CmgateError::unavailable(GRAPH_PLANE, "directory plane is not configured"))
    }

    async fn entra_device_id(&self, computer_name: &str) -> Result<String> {
        self.client()?
            .get_entra_device_id_by_name(computer_name)
            .await?
            .ok_or_else(|| CmgateError::not_found("Entra device", computer_name))
    }

    async fn group_id(&self, group_name: &str) -> Result<String> {
        self.client()?
            .get_group_id_by_name(group_name)
            .await?
            .ok_or_else(|| CmgateError::not_found("Group", group_name))
    }

    /// A name containing `@` is looked up as a UPN, anything else by
    /// on-premises SAM account name with any `DOMAIN\` prefix dropped.
    async fn user_id(&self, user_name: &str) -> Result<String> {
        let client = self.client()?;
        let found = if user_name.contains('@') {
            client.get_user_id_by_upn(user_name).await?
        } else {
            client
                .get_user_id_by_sam_account_name(bare_account_name(user_name))
                .await?
        };
        found.ok_or_else(|| CmgateError::not_found("User", user_name))
    }

    async fn intune_device_id(&self, computer_name: &str) -> Result<String> {
        self.client()?
            .get_intune_device_id_by_name(computer_name)
            .await?
            .ok_or_else(|| CmgateError::not_found("Intune device", computer_name))
    }

    // -----------------------------------------------------------------------
    // Entra ID groups
    // -----------------------------------------------------------------------

    /// Returns whether membership changed.
    pub async fn add_computer_to_group(&self, computer_name: &str, group_name: &str) -> Result<bool> {
        let result = async {
            let device_id = self.entra_device_id(computer_name).await?;
            let group_id = self.group_id(group_name).await?;
            self.client()?.add_device_to_group(&device_id, &group_id).await
        }
        .await
        .inspect_err(|e| warn!(computer_name, group_name, error = %e, "Failed to add computer to group"))?;
        info!(computer_name, group_name, changed = result, "Computer group membership updated");
        Ok(result)
    }

    pub async fn remove_computer_from_group(&self, computer_name: &str, group_name: &str) -> Result<bool> {
        let result = async {
            let device_id = self.entra_device_id(computer_name).await?;
            let group_id = self.group_id(group_name).await?;
            self.client()?.remove_device_from_group(&device_id, &group_id).await
        }
        .await
        .inspect_err(|e| {
            warn!(computer_name, group_name, error = %e, "Failed to remove computer from group");
        })?;
        info!(computer_name, group_name, changed = result, "Computer group membership updated");
        Ok(result)
    }

    pub async fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<bool> {
        let result = async {
            let user_id = self.user_id(user_name).await?;
            let group_id = self.group_id(group_name).await?;
            self.client()?.add_user_to_group(&user_id, &group_id).await
        }
        .await
        .inspect_err(|e| warn!(user_name, group_name, error = %e, "Failed to add user to group"))?;
        info!(user_name, group_name, changed = result, "User group membership updated");
        Ok(result)
    }

    pub async fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<bool> {
        let result = async {
            let user_id = self.user_id(user_name).await?;
            let group_id = self.group_id(group_name).await?;
            self.client()?.remove_user_from_group(&user_id, &group_id).await
        }
        .await
        .inspect_err(|e| warn!(user_name, group_name, error = %e, "Failed to remove user from group"))?;
        info!(user_name, group_name, changed = result, "User group membership updated");
        Ok(result)
    }

    pub async fn is_computer_in_group(&self, computer_name: &str, group_name: &str) -> Result<bool> {
        async {
            let device_id = self.entra_device_id(computer_name).await?;
            let group_id = self.group_id(group_name).await?;
            self.client()?
                .is_device_member_of_group(&device_id, &group_id)
                .await
        }
        .await
        .inspect_err(|e| warn!(computer_name, group_name, error = %e, "Group membership check failed"))
    }

    // -----------------------------------------------------------------------
    // Intune
    // -----------------------------------------------------------------------

    pub async fn intune_device_exists(&self, computer_name: &str) -> Result<bool> {
        let found = self
            .client()?
            .get_intune_device_id_by_name(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Intune device lookup failed"))?;
        Ok(found.is_some())
    }

    pub async fn is_co_managed(&self, computer_name: &str) -> Result<bool> {
        async {
            let device_id = self.intune_device_id(computer_name).await?;
            self.client()?.is_device_co_managed(&device_id).await
        }
        .await
        .inspect_err(|e| warn!(computer_name, error = %e, "Co-management check failed"))
    }

    /// UPN of the device's primary user, `None` when unassigned.
    pub async fn primary_user(&self, computer_name: &str) -> Result<Option<String>> {
        async {
            let device_id = self.intune_device_id(computer_name).await?;
            self.client()?.get_primary_user(&device_id).await
        }
        .await
        .inspect_err(|e| warn!(computer_name, error = %e, "Primary user lookup failed"))
    }

    pub async fn set_primary_user(&self, computer_name: &str, user_name: &str) -> Result<()> {
        async {
            let device_id = self.intune_device_id(computer_name).await?;
            let user_id = self.user_id(user_name).await?;
            self.client()?.set_primary_user(&device_id, &user_id).await
        }
        .await
        .inspect_err(|e| warn!(computer_name, user_name, error = %e, "Failed to set Intune primary user"))?;
        info!(computer_name, user_name, "Intune primary user set");
        Ok(())
    }

    pub async fn set_device_category(&self, computer_name: &str, category_name: &str) -> Result<()> {
        async {
            let device_id = self.intune_device_id(computer_name).await?;
            self.client()?
                .set_device_category(&device_id, category_name)
                .await
        }
        .await
        .inspect_err(|e| {
            warn!(computer_name, category_name, error = %e, "Failed to set device category");
        })?;
        info!(computer_name, category_name, "Intune device category set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_directory_is_unavailable() {
        let directory = DirectoryService::disabled();
        assert!(!directory.is_enabled());

        let err = directory
            .add_computer_to_group("PC01", "Pilot")
            .await
            .unwrap_err();
        assert!(matches!(err, CmgateError::Unavailable { .. }));

        let err = directory.intune_device_exists("PC01").await.unwrap_err();
        assert_eq!(err.error_code(), "unavailable");
    }
}
