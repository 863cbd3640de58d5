//! Device lifecycle on the management plane.

use cmgate_connector_configmgr::ManagementPlaneClient;
use cmgate_core::{CmgateError, DeviceRecord, HardwareId, ResourceId, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DeviceService {
    plane: Arc<ManagementPlaneClient>,
}

impl DeviceService {
    pub fn new(plane: Arc<ManagementPlaneClient>) -> Self {
        Self { plane }
    }

    pub async fn add_by_bios_guid(&self, computer_name: &str, bios_guid: &str) -> Result<ResourceId> {
        let id = HardwareId::smbios_guid(bios_guid)?;
        self.add(computer_name, &id).await
    }

    pub async fn add_by_mac(&self, computer_name: &str, mac_address: &str) -> Result<ResourceId> {
        let id = HardwareId::mac(mac_address)?;
        self.add(computer_name, &id).await
    }

    async fn add(&self, computer_name: &str, hardware_id: &HardwareId) -> Result<ResourceId> {
        let resource_id = self
            .plane
            .add_device(computer_name, hardware_id)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Failed to add computer"))?;
        info!(computer_name, %resource_id, kind = ?hardware_id.kind(), "Computer added");
        Ok(resource_id)
    }

    /// Deletes every record with this name. `NotFound` when there was none.
    pub async fn delete(&self, computer_name: &str) -> Result<usize> {
        let deleted = self
            .plane
            .delete_device(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Failed to delete computer"))?;
        if deleted == 0 {
            return Err(CmgateError::not_found("Computer", computer_name));
        }
        info!(computer_name, deleted, "Computer deleted");
        Ok(deleted)
    }

    pub async fn delete_by_bios_guid(&self, bios_guid: &str) -> Result<usize> {
        let id = HardwareId::smbios_guid(bios_guid)?;
        let deleted = self
            .plane
            .delete_device_by_smbios_guid(&id)
            .await
            .inspect_err(|e| warn!(bios_guid, error = %e, "Failed to delete computer by GUID"))?;
        if deleted == 0 {
            return Err(CmgateError::not_found("Computer", bios_guid));
        }
        info!(bios_guid, deleted, "Computer deleted by GUID");
        Ok(deleted)
    }

    pub async fn exists(&self, computer_name: &str) -> Result<bool> {
        self.plane
            .device_exists(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Existence check failed"))
    }

    pub async fn exists_by_resource_id(&self, resource_id: i64) -> Result<bool> {
        self.plane
            .device_exists_by_resource_id(ResourceId(resource_id))
            .await
            .inspect_err(|e| warn!(resource_id, error = %e, "Existence check failed"))
    }

    pub async fn exists_by_bios_guid(&self, bios_guid: &str) -> Result<bool> {
        let id = HardwareId::smbios_guid(bios_guid)?;
        self.plane
            .device_exists_by_smbios_guid(&id)
            .await
            .inspect_err(|e| warn!(bios_guid, error = %e, "Existence check failed"))
    }

    pub async fn details(&self, computer_name: &str) -> Result<DeviceRecord> {
        self.plane
            .find_device(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Computer lookup failed"))?
            .ok_or_else(|| CmgateError::not_found("Computer", computer_name))
    }

    pub async fn clear_pxe_flag(&self, computer_name: &str) -> Result<()> {
        self.plane
            .clear_pxe_flag(computer_name)
            .await
            .inspect_err(|e| warn!(computer_name, error = %e, "Failed to clear PXE flag"))?;
        info!(computer_name, "PXE flag cleared");
        Ok(())
    }
}
