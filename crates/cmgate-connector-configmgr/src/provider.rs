//! The management provider seam.

use crate::error::ProviderResult;
use crate::object::{InstancePath, PlaneObject};
use crate::query::WqlQuery;

/// Native, synchronous access to a ConfigMgr site's SMS provider.
///
/// Every call may block on network I/O. Callers on an async runtime go through
/// [`crate::ManagementPlaneClient`], which moves each operation onto the
/// blocking pool. An implementation owns its connection and releases it when
/// dropped.
pub trait ManagementProvider: Send + Sync + 'static {
    /// Short label used in logs, e.g. `admin_service` or `in_memory`.
    fn kind(&self) -> &'static str;

    /// Runs a query and returns the matching rows.
    fn query(&self, query: &WqlQuery) -> ProviderResult<Vec<PlaneObject>>;

    /// Invokes a static method, e.g. `SMS_Site.ImportMachineEntry`, and
    /// returns its out-parameters.
    fn execute_method(
        &self,
        class: &str,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject>;

    /// Invokes a method on one instance, e.g. `AddMembershipRule` on a collection.
    fn execute_instance_method(
        &self,
        path: &InstancePath,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject>;

    /// Creates and persists a new instance, returning it with the keys the
    /// site assigned.
    fn put_instance(&self, class: &str, properties: PlaneObject) -> ProviderResult<PlaneObject>;

    fn delete_instance(&self, path: &InstancePath) -> ProviderResult<()>;
}
