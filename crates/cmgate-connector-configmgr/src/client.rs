//! Async façade over the blocking operations.

use std::sync::Arc;

use cmgate_core::{
    AffinitySource, CmgateError, Collection, DeviceRecord, HardwareId, MembershipAction,
    MigrationStatus, ResourceId, Result,
};
use tracing::{debug, instrument};

use crate::operations::{self, PrimaryUserChanges};
use crate::provider::ManagementProvider;

/// Cloneable handle to one ConfigMgr site.
///
/// Each call runs on tokio's blocking pool, so a slow site never stalls the
/// request-handling threads.
#[derive(Clone)]
pub struct ManagementPlaneClient {
    provider: Arc<dyn ManagementProvider>,
}

impl std::fmt::Debug for ManagementPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementPlaneClient")
            .field("provider", &self.provider.kind())
            .finish()
    }
}

impl ManagementPlaneClient {
    pub fn new(provider: Arc<dyn ManagementProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn provider_kind(&self) -> &'static str {
        self.provider.kind()
    }

    /// Releases this handle's provider reference on the blocking pool, so a
    /// provider owning blocking resources is torn down off the runtime.
    pub async fn shutdown(self) {
        let kind = self.provider.kind();
        let provider = self.provider;
        if tokio::task::spawn_blocking(move || drop(provider)).await.is_err() {
            debug!(provider = kind, "Provider release task did not complete");
        }
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ManagementProvider) -> Result<T> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || f(provider.as_ref()))
            .await
            .map_err(|e| CmgateError::Internal(format!("{operation} task failed: {e}")))?
    }

    pub async fn site_code(&self) -> Result<String> {
        self.run("site_code", operations::site_code).await
    }

    #[instrument(skip(self))]
    pub async fn find_device(&self, name: &str) -> Result<Option<DeviceRecord>> {
        let name = name.to_string();
        self.run("find_device", move |p| operations::find_device(p, &name))
            .await
    }

    /// `false` only when the site answered and holds no live record; site
    /// failures propagate.
    pub async fn device_exists(&self, name: &str) -> Result<bool> {
        Ok(self.find_device(name).await?.is_some())
    }

    pub async fn device_exists_by_resource_id(&self, resource_id: ResourceId) -> Result<bool> {
        let found = self
            .run("find_device_by_resource_id", move |p| {
                operations::find_device_by_resource_id(p, resource_id)
            })
            .await?;
        Ok(found.is_some())
    }

    pub async fn device_exists_by_smbios_guid(&self, guid: &HardwareId) -> Result<bool> {
        let guid = guid.clone();
        let found = self
            .run("find_device_by_smbios_guid", move |p| {
                operations::find_device_by_smbios_guid(p, &guid)
            })
            .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self), fields(kind = ?hardware_id.kind()))]
    pub async fn add_device(&self, name: &str, hardware_id: &HardwareId) -> Result<ResourceId> {
        let name = name.to_string();
        let hardware_id = hardware_id.clone();
        self.run("add_device", move |p| {
            operations::add_device(p, &name, &hardware_id)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_device(&self, name: &str) -> Result<usize> {
        let name = name.to_string();
        self.run("delete_device", move |p| operations::delete_device(p, &name))
            .await
    }

    #[instrument(skip(self), fields(guid = %guid.value()))]
    pub async fn delete_device_by_smbios_guid(&self, guid: &HardwareId) -> Result<usize> {
        let guid = guid.clone();
        self.run("delete_device_by_smbios_guid", move |p| {
            operations::delete_device_by_smbios_guid(p, &guid)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn clear_pxe_flag(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run("clear_pxe_flag", move |p| operations::clear_pxe_flag(p, &name))
            .await
    }

    pub async fn find_collection_by_name(&self, name: &str) -> Result<Option<Collection>> {
        let name = name.to_string();
        self.run("find_collection_by_name", move |p| {
            operations::find_collection_by_name(p, &name)
        })
        .await
    }

    #[instrument(skip(self, description))]
    pub async fn create_collection(
        &self,
        name: &str,
        description: &str,
        limiting_collection_name: &str,
    ) -> Result<String> {
        let (name, description, limiting) = (
            name.to_string(),
            description.to_string(),
            limiting_collection_name.to_string(),
        );
        self.run("create_collection", move |p| {
            operations::create_collection(p, &name, &description, &limiting)
        })
        .await
    }

    pub async fn get_collection_members(&self, collection_id: &str) -> Result<Vec<String>> {
        let collection_id = collection_id.to_string();
        self.run("get_collection_members", move |p| {
            operations::get_collection_members(p, &collection_id)
        })
        .await
    }

    pub async fn is_device_member(&self, collection_id: &str, device_name: &str) -> Result<bool> {
        let (collection_id, device_name) = (collection_id.to_string(), device_name.to_string());
        self.run("is_device_member", move |p| {
            operations::is_device_member(p, &collection_id, &device_name)
        })
        .await
    }

    /// Returns whether the site was changed; a request matching the current
    /// state is a successful no-op.
    #[instrument(skip(self))]
    pub async fn add_or_remove_member(
        &self,
        collection_id: &str,
        device_name: &str,
        action: MembershipAction,
    ) -> Result<bool> {
        let (collection_id, device_name) = (collection_id.to_string(), device_name.to_string());
        self.run("add_or_remove_member", move |p| {
            operations::add_or_remove_member(p, &collection_id, &device_name, action)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn refresh_membership(&self, collection_id: &str) -> Result<()> {
        let collection_id = collection_id.to_string();
        self.run("refresh_membership", move |p| {
            operations::refresh_membership(p, &collection_id)
        })
        .await
    }

    pub async fn get_primary_users(&self, name: &str) -> Result<Vec<String>> {
        let name = name.to_string();
        self.run("get_primary_users", move |p| {
            operations::get_primary_users(p, &name)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_primary_user(&self, name: &str, user_name: &str) -> Result<()> {
        let (name, user_name) = (name.to_string(), user_name.to_string());
        self.run("set_primary_user", move |p| {
            operations::set_primary_user(p, &name, &user_name, AffinitySource::Administrator)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_primary_user(&self, name: &str, user_name: &str) -> Result<bool> {
        let (name, user_name) = (name.to_string(), user_name.to_string());
        self.run("delete_primary_user", move |p| {
            operations::delete_primary_user(p, &name, &user_name)
        })
        .await
    }

    #[instrument(skip(self, user_names))]
    pub async fn replace_primary_users(
        &self,
        name: &str,
        user_names: Vec<String>,
    ) -> Result<PrimaryUserChanges> {
        let name = name.to_string();
        self.run("replace_primary_users", move |p| {
            operations::replace_primary_users(p, &name, &user_names)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_migration_association(&self, source: &str, destination: &str) -> Result<()> {
        let (source, destination) = (source.to_string(), destination.to_string());
        self.run("create_migration_association", move |p| {
            operations::create_migration_association(p, &source, &destination)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_migration_association(&self, source: &str, destination: &str) -> Result<()> {
        let (source, destination) = (source.to_string(), destination.to_string());
        self.run("remove_migration_association", move |p| {
            operations::remove_migration_association(p, &source, &destination)
        })
        .await
    }

    pub async fn get_migration_status(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<MigrationStatus>> {
        let (source, destination) = (source.to_string(), destination.to_string());
        self.run("get_migration_status", move |p| {
            operations::get_migration_status(p, &source, &destination)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;

    fn client_with(site: InMemoryProvider) -> (ManagementPlaneClient, Arc<InMemoryProvider>) {
        let site = Arc::new(site);
        let provider: Arc<dyn ManagementProvider> = site.clone();
        (ManagementPlaneClient::new(provider), site)
    }

    #[tokio::test]
    async fn test_absent_device_reports_false_and_not_found() {
        let (client, _) = client_with(InMemoryProvider::new("PS1"));
        assert!(!client.device_exists("GHOST").await.unwrap());
        assert!(client.clear_pxe_flag("GHOST").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_device_exists_propagates_site_failure() {
        let (client, site) = client_with(InMemoryProvider::new("PS1"));
        site.set_reachable(false);
        let err = client.device_exists("PC01").await.unwrap_err();
        assert_eq!(err.error_code(), "unavailable");
    }

    #[tokio::test]
    async fn test_add_device_then_lookups() {
        let (client, _) = client_with(InMemoryProvider::new("PS1"));
        let guid = HardwareId::smbios_guid("123e4567-e89b-12d3-a456-426614174000").unwrap();
        let id = client.add_device("PC01", &guid).await.unwrap();

        assert!(client.device_exists("PC01").await.unwrap());
        assert!(client.device_exists_by_resource_id(id).await.unwrap());
        assert!(client.device_exists_by_smbios_guid(&guid).await.unwrap());
        assert_eq!(client.delete_device_by_smbios_guid(&guid).await.unwrap(), 1);
        assert!(!client.device_exists("PC01").await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_round_trip_is_idempotent() {
        let (client, site) = client_with(InMemoryProvider::new("PS1"));
        site.seed_device("PC01", None);
        let collection = site.seed_collection("Pilot", None);

        for _ in 0..2 {
            client
                .add_or_remove_member(&collection, "PC01", MembershipAction::Add)
                .await
                .unwrap();
        }
        assert!(client.is_device_member(&collection, "PC01").await.unwrap());
        assert_eq!(site.direct_rules(&collection).len(), 1);

        client
            .add_or_remove_member(&collection, "PC01", MembershipAction::Remove)
            .await
            .unwrap();
        assert!(!client.is_device_member(&collection, "PC01").await.unwrap());
    }

    #[tokio::test]
    async fn test_primary_user_delete_accepts_domain_qualified_name() {
        let (client, site) = client_with(InMemoryProvider::new("PS1"));
        site.seed_device("PC01", None);
        site.seed_user("CONTOSO\\jdoe");

        client.set_primary_user("PC01", "CONTOSO\\jdoe").await.unwrap();
        assert!(client.delete_primary_user("PC01", "CONTOSO\\jdoe").await.unwrap());
        assert!(client.get_primary_users("PC01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_releases_provider() {
        let (client, site) = client_with(InMemoryProvider::new("PS1"));
        assert_eq!(client.site_code().await.unwrap(), "PS1");
        client.shutdown().await;
        assert_eq!(Arc::strong_count(&site), 1);
    }
}
