//! State-migration (USMT) associations.

use cmgate_connector_configmgr::ManagementPlaneClient;
use cmgate_core::{CmgateError, MigrationStatus, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct MigrationService {
    plane: Arc<ManagementPlaneClient>,
}

impl MigrationService {
    pub fn new(plane: Arc<ManagementPlaneClient>) -> Self {
        Self { plane }
    }

    pub async fn create(&self, source: &str, destination: &str) -> Result<()> {
        self.plane
            .create_migration_association(source, destination)
            .await
            .inspect_err(|e| warn!(source, destination, error = %e, "Failed to create association"))?;
        info!(source, destination, "Migration association created");
        Ok(())
    }

    pub async fn remove(&self, source: &str, destination: &str) -> Result<()> {
        self.plane
            .remove_migration_association(source, destination)
            .await
            .inspect_err(|e| warn!(source, destination, error = %e, "Failed to remove association"))?;
        info!(source, destination, "Migration association removed");
        Ok(())
    }

    /// `NotFound` when the site holds no association for the pair.
    pub async fn status(&self, source: &str, destination: &str) -> Result<MigrationStatus> {
        self.plane
            .get_migration_status(source, destination)
            .await
            .inspect_err(|e| warn!(source, destination, error = %e, "Status lookup failed"))?
            .ok_or_else(|| {
                CmgateError::not_found("Migration association", format!("{source} -> {destination}"))
            })
    }
}
