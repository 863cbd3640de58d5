//! Device collections and direct membership.

use cmgate_connector_configmgr::ManagementPlaneClient;
use cmgate_core::{CmgateError, Collection, MembershipAction, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CollectionService {
    plane: Arc<ManagementPlaneClient>,
}

impl CollectionService {
    pub fn new(plane: Arc<ManagementPlaneClient>) -> Self {
        Self { plane }
    }

    /// Creates a device collection under `limiting_collection_name` and
    /// returns the site-assigned id.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        limiting_collection_name: &str,
    ) -> Result<String> {
        let collection_id = self
            .plane
            .create_collection(name, description, limiting_collection_name)
            .await
            .inspect_err(|e| warn!(collection_name = name, error = %e, "Failed to create collection"))?;
        info!(collection_name = name, collection_id = %collection_id, "Collection created");
        Ok(collection_id)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Collection> {
        self.plane
            .find_collection_by_name(name)
            .await
            .inspect_err(|e| warn!(collection_name = name, error = %e, "Collection lookup failed"))?
            .ok_or_else(|| CmgateError::not_found("Collection", name))
    }

    pub async fn members(&self, collection_id: &str) -> Result<Vec<String>> {
        self.plane
            .get_collection_members(collection_id)
            .await
            .inspect_err(|e| warn!(collection_id, error = %e, "Failed to list collection members"))
    }

    pub async fn is_member(&self, collection_id: &str, computer_name: &str) -> Result<bool> {
        self.plane
            .is_device_member(collection_id, computer_name)
            .await
            .inspect_err(|e| {
                warn!(collection_id, computer_name, error = %e, "Membership check failed");
            })
    }

    /// Idempotent; returns whether a rule was added.
    pub async fn add_member(&self, collection_id: &str, computer_name: &str) -> Result<bool> {
        self.change(collection_id, computer_name, MembershipAction::Add).await
    }

    /// Idempotent; returns whether a rule was removed.
    pub async fn remove_member(&self, collection_id: &str, computer_name: &str) -> Result<bool> {
        self.change(collection_id, computer_name, MembershipAction::Remove).await
    }

    async fn change(
        &self,
        collection_id: &str,
        computer_name: &str,
        action: MembershipAction,
    ) -> Result<bool> {
        let changed = self
            .plane
            .add_or_remove_member(collection_id, computer_name, action)
            .await
            .inspect_err(|e| {
                warn!(collection_id, computer_name, ?action, error = %e, "Membership change failed");
            })?;
        info!(collection_id, computer_name, ?action, changed, "Collection membership updated");
        Ok(changed)
    }

    /// Best effort: success means the site accepted the request, not that
    /// membership has been re-evaluated.
    pub async fn refresh(&self, collection_id: &str) -> Result<()> {
        self.plane
            .refresh_membership(collection_id)
            .await
            .inspect_err(|e| warn!(collection_id, error = %e, "Refresh request failed"))?;
        info!(collection_id, "Collection refresh requested");
        Ok(())
    }
}
