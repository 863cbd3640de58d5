//! Entra ID and Intune operations.

use cmgate_core::{CmgateError, Result};
use tracing::{debug, info, instrument};
use urlencoding::encode;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph_client::{odata_string, GraphClient, ListOptions};
use crate::models::{DeviceCategory, DirectoryObject, GraphUser, ManagedDevice};

/// Directory-plane client for one tenant.
///
/// Lookups return `None` when nothing matches. Id arguments are Graph object
/// ids obtained from those lookups.
#[derive(Debug)]
pub struct DirectoryPlaneClient {
    graph: GraphClient,
}

impl DirectoryPlaneClient {
    pub fn new(config: GraphConfig) -> Result<Self> {
        Ok(Self {
            graph: GraphClient::new(config)?,
        })
    }

    pub fn from_graph_client(graph: GraphClient) -> Self {
        Self { graph }
    }

    async fn first_id(&self, path: &str, options: ListOptions) -> Result<Option<String>> {
        let objects: Vec<DirectoryObject> = self.graph.list(path, &options.select("id")).await?;
        Ok(objects.into_iter().next().map(|o| o.id))
    }

    // -----------------------------------------------------------------------
    // Entra ID
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_user_id_by_upn(&self, user_principal_name: &str) -> Result<Option<String>> {
        let filter = format!("(userPrincipalName eq {})", odata_string(user_principal_name));
        self.first_id("users", ListOptions::filter(filter)).await
    }

    /// On-premises attribute filters are advanced queries and need eventual
    /// consistency.
    #[instrument(skip(self))]
    pub async fn get_user_id_by_sam_account_name(&self, sam_account_name: &str) -> Result<Option<String>> {
        let filter = format!("onPremisesSamAccountName eq {}", odata_string(sam_account_name));
        self.first_id("users", ListOptions::filter(filter).eventual())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_entra_device_id_by_name(&self, device_name: &str) -> Result<Option<String>> {
        let filter = format!("displayName eq {}", odata_string(device_name));
        self.first_id("devices", ListOptions::filter(filter)).await
    }

    #[instrument(skip(self))]
    pub async fn get_group_id_by_name(&self, group_name: &str) -> Result<Option<String>> {
        let filter = format!("displayName eq {}", odata_string(group_name));
        self.first_id("groups", ListOptions::filter(filter)).await
    }

    /// Lists the group's members and checks containment.
    #[instrument(skip(self))]
    pub async fn is_device_member_of_group(&self, device_id: &str, group_id: &str) -> Result<bool> {
        let members: Vec<DirectoryObject> = self
            .graph
            .list(
                &format!("groups/{}/members", encode(group_id)),
                &ListOptions::default().select("id"),
            )
            .await?;
        Ok(members.iter().any(|m| m.id.eq_ignore_ascii_case(device_id)))
    }

    /// Adds a member reference. Graph answers a successful add with an empty
    /// body; any other body yields `false`. Errors, including "already
    /// exists", reach the caller.
    async fn add_member(&self, object_id: &str, group_id: &str) -> Result<bool> {
        let reference = self
            .graph
            .reference(&format!("directoryObjects/{}", encode(object_id)))?;
        let body = self
            .graph
            .post(&format!("groups/{}/members/$ref", encode(group_id)), &reference)
            .await?;
        if body.is_some() {
            debug!(object_id, group_id, "Group member add returned a body");
            return Ok(false);
        }
        info!(object_id, group_id, "Added group member");
        Ok(true)
    }

    /// Deletes a member reference. Returns `false` when Graph answers 404.
    async fn remove_member(&self, object_id: &str, group_id: &str) -> Result<bool> {
        let path = format!("groups/{}/members/{}/$ref", encode(group_id), encode(object_id));
        match self.graph.delete(&path).await {
            Ok(()) => {
                info!(object_id, group_id, "Removed group member");
                Ok(true)
            }
            Err(GraphError::NotFound(_)) => {
                debug!(object_id, group_id, "Not a group member");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn add_device_to_group(&self, device_id: &str, group_id: &str) -> Result<bool> {
        self.add_member(device_id, group_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_device_from_group(&self, device_id: &str, group_id: &str) -> Result<bool> {
        self.remove_member(device_id, group_id).await
    }

    #[instrument(skip(self))]
    pub async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<bool> {
        self.add_member(user_id, group_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<bool> {
        self.remove_member(user_id, group_id).await
    }

    // -----------------------------------------------------------------------
    // Intune
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_intune_device_id_by_name(&self, device_name: &str) -> Result<Option<String>> {
        let filter = format!("(deviceName eq {})", odata_string(device_name));
        let devices: Vec<ManagedDevice> = self
            .graph
            .list("deviceManagement/managedDevices", &ListOptions::filter(filter))
            .await?;
        Ok(devices.into_iter().next().map(|d| d.id))
    }

    /// UPN of the first user assigned to the managed device.
    #[instrument(skip(self))]
    pub async fn get_primary_user(&self, device_id: &str) -> Result<Option<String>> {
        let users: Vec<GraphUser> = self
            .graph
            .list(
                &format!("deviceManagement/managedDevices/{}/users", encode(device_id)),
                &ListOptions::default(),
            )
            .await?;
        Ok(users.into_iter().find_map(|u| u.user_principal_name))
    }

    #[instrument(skip(self))]
    pub async fn set_primary_user(&self, device_id: &str, user_id: &str) -> Result<()> {
        let reference = self.graph.reference(&format!("users/{}", encode(user_id)))?;
        self.graph
            .post(
                &format!(
                    "deviceManagement/managedDevices('{}')/users/$ref",
                    encode(device_id)
                ),
                &reference,
            )
            .await?;
        info!(device_id, user_id, "Set Intune primary user");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn is_device_co_managed(&self, device_id: &str) -> Result<bool> {
        let device: ManagedDevice = self
            .graph
            .get(&format!(
                "deviceManagement/managedDevices/{}?$select=id,managementAgent,deviceEnrollmentType",
                encode(device_id)
            ))
            .await?;
        Ok(device.is_co_managed())
    }

    /// Resolves the category by case-insensitive display name, then links it.
    #[instrument(skip(self))]
    pub async fn set_device_category(&self, device_id: &str, category_name: &str) -> Result<()> {
        let categories: Vec<DeviceCategory> = self
            .graph
            .list(
                "deviceManagement/deviceCategories",
                &ListOptions::default().select("id,displayName"),
            )
            .await?;
        let category = categories
            .into_iter()
            .find(|c| {
                c.display_name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(category_name))
            })
            .ok_or_else(|| {
                CmgateError::operation_failed(
                    "Set device category",
                    format!("device category '{category_name}' does not exist"),
                )
            })?;

        let reference = self.graph.reference(&format!(
            "deviceManagement/deviceCategories/{}",
            encode(&category.id)
        ))?;
        self.graph
            .put(
                &format!(
                    "deviceManagement/managedDevices/{}/deviceCategory/$ref",
                    encode(device_id)
                ),
                &reference,
            )
            .await?;
        info!(device_id, category_id = %category.id, "Set Intune device category");
        Ok(())
    }
}
