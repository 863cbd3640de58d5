//! Blocking domain operations over a [`ManagementProvider`].
//!
//! Lookups return `Option` when the entity may legitimately be absent and
//! `CmgateError::NotFound` when an operation cannot proceed without it.
//! Provider failures are never folded into "not found".

use cmgate_core::{
    AffinitySource, CmgateError, Collection, DeviceRecord, HardwareId, IdKind, MembershipAction,
    MigrationStatus, ResourceId, Result, AFFINITY_TYPE_ID,
};
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::mapping::{self, class, prop, DEVICE_COLLECTION_TYPE};
use crate::object::{InstancePath, PlaneObject};
use crate::provider::ManagementProvider;
use crate::query::{Filter, WqlQuery};

type Provider = dyn ManagementProvider;

fn rows(provider: &Provider, query: &WqlQuery) -> Result<Vec<PlaneObject>> {
    debug!(provider = provider.kind(), wql = %query, "Querying site");
    Ok(provider.query(query)?)
}

/// First row of the result set, mapped; `None` when the set is empty.
fn first<T>(
    provider: &Provider,
    query: &WqlQuery,
    map: fn(&PlaneObject) -> ProviderResult<T>,
) -> Result<Option<T>> {
    let rows = rows(provider, query)?;
    Ok(rows.first().map(map).transpose()?)
}

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CmgateError::invalid_argument(field, "must not be empty"));
    }
    Ok(())
}

/// Collection ids become part of a class name (`SMS_CM_RES_COLL_<id>`), so only
/// site-style alphanumeric ids are accepted.
fn validate_collection_id(collection_id: &str) -> Result<()> {
    let valid = !collection_id.is_empty()
        && collection_id.len() <= 16
        && collection_id.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(CmgateError::invalid_argument(
            "collectionId",
            format!("'{collection_id}' is not a collection id"),
        ));
    }
    Ok(())
}

fn check_return_value(operation: &str, out: &PlaneObject) -> Result<()> {
    match mapping::return_value(out) {
        0 => Ok(()),
        code => Err(CmgateError::operation_failed(
            operation,
            format!("site returned error code {code}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// Reads the site code; doubles as a connectivity probe.
pub fn site_code(provider: &Provider) -> Result<String> {
    let query = WqlQuery::select(class::SITE).properties(&[prop::SITE_CODE]);
    first(provider, &query, mapping::site_code)?
        .ok_or_else(|| CmgateError::not_found("Site", provider.kind()))
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

fn live_devices() -> WqlQuery {
    WqlQuery::select(class::SYSTEM)
        .properties(&[prop::RESOURCE_ID, prop::NAME, prop::SMS_UNIQUE_IDENTIFIER])
        .filter(Filter::zero_or_null(prop::OBSOLETE))
}

pub fn find_device(provider: &Provider, name: &str) -> Result<Option<DeviceRecord>> {
    require_name("computerName", name)?;
    let query = live_devices().filter(Filter::eq(prop::NAME, name));
    first(provider, &query, mapping::device)
}

pub fn find_device_by_resource_id(
    provider: &Provider,
    resource_id: ResourceId,
) -> Result<Option<DeviceRecord>> {
    let query = live_devices().filter(Filter::eq(prop::RESOURCE_ID, resource_id));
    first(provider, &query, mapping::device)
}

pub fn find_device_by_smbios_guid(
    provider: &Provider,
    guid: &HardwareId,
) -> Result<Option<DeviceRecord>> {
    let query = live_devices().filter(Filter::eq(prop::SMBIOS_GUID, guid.value()));
    first(provider, &query, mapping::device)
}

pub fn require_device(provider: &Provider, name: &str) -> Result<DeviceRecord> {
    find_device(provider, name)?.ok_or_else(|| CmgateError::not_found("Computer", name))
}

/// Imports a device record and returns its new resource id.
///
/// Duplicates are detected by the site itself, not by a pre-check.
pub fn add_device(provider: &Provider, name: &str, hardware_id: &HardwareId) -> Result<ResourceId> {
    require_name("computerName", name)?;

    let mut params = PlaneObject::new().with(prop::NETBIOS_NAME, name);
    match hardware_id.kind() {
        IdKind::Mac => params.set(prop::MAC_ADDRESS, hardware_id.value()),
        IdKind::SmbiosGuid => params.set(prop::SMBIOS_GUID, hardware_id.value()),
    }
    params.set(prop::OVERWRITE_EXISTING_RECORD, false);

    let out = provider
        .execute_method(class::SITE, "ImportMachineEntry", params)
        .map_err(|e| match e {
            ProviderError::AlreadyExists(_) => CmgateError::already_exists("Computer", name),
            other => other.into(),
        })?;
    check_return_value("Import computer", &out)?;
    Ok(mapping::resource_id(&out)?)
}

fn delete_matching(provider: &Provider, filter: Filter) -> Result<usize> {
    let query = WqlQuery::select(class::SYSTEM)
        .properties(&[prop::RESOURCE_ID, prop::NAME])
        .filter(filter);
    let mut deleted = 0;
    for row in rows(provider, &query)? {
        let resource_id = mapping::resource_id(&row)?;
        provider.delete_instance(&InstancePath::new(
            class::SYSTEM,
            prop::RESOURCE_ID,
            resource_id,
        ))?;
        deleted += 1;
    }
    Ok(deleted)
}

/// Deletes every record carrying `name`, duplicates and obsolete rows
/// included. Returns how many were removed.
pub fn delete_device(provider: &Provider, name: &str) -> Result<usize> {
    require_name("computerName", name)?;
    delete_matching(provider, Filter::eq(prop::NAME, name))
}

pub fn delete_device_by_smbios_guid(provider: &Provider, guid: &HardwareId) -> Result<usize> {
    delete_matching(provider, Filter::eq(prop::SMBIOS_GUID, guid.value()))
}

pub fn clear_pxe_flag(provider: &Provider, name: &str) -> Result<()> {
    let device = require_device(provider, name)?;
    let params = PlaneObject::new().with(prop::RESOURCE_IDS, json!([device.resource_id.get()]));
    let out = provider.execute_method(class::COLLECTION, "ClearLastNBSAdvForMachines", params)?;
    match mapping::status_code(&out) {
        0 => Ok(()),
        code => Err(CmgateError::operation_failed(
            "Clear PXE flag",
            format!("site returned status {code} for {name}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

fn collections() -> WqlQuery {
    WqlQuery::select(class::COLLECTION).properties(&[
        prop::COLLECTION_ID,
        prop::NAME,
        prop::COMMENT,
        prop::LIMIT_TO_COLLECTION_ID,
    ])
}

pub fn find_collection_by_name(provider: &Provider, name: &str) -> Result<Option<Collection>> {
    require_name("collectionName", name)?;
    let query = collections().filter(Filter::eq(prop::NAME, name));
    first(provider, &query, mapping::collection)
}

pub fn require_collection(provider: &Provider, collection_id: &str) -> Result<Collection> {
    validate_collection_id(collection_id)?;
    let query = collections().filter(Filter::eq(prop::COLLECTION_ID, collection_id));
    first(provider, &query, mapping::collection)?
        .ok_or_else(|| CmgateError::not_found("Collection", collection_id))
}

/// Creates a device collection limited to `limiting_collection_name` and
/// returns the id the site assigned.
pub fn create_collection(
    provider: &Provider,
    name: &str,
    description: &str,
    limiting_collection_name: &str,
) -> Result<String> {
    require_name("collectionName", name)?;
    let limiting = find_collection_by_name(provider, limiting_collection_name)?
        .ok_or_else(|| CmgateError::not_found("Collection", limiting_collection_name))?;

    let properties = PlaneObject::new()
        .with(prop::NAME, name)
        .with(prop::COMMENT, description)
        .with(prop::COLLECTION_TYPE, DEVICE_COLLECTION_TYPE)
        .with(prop::LIMIT_TO_COLLECTION_ID, limiting.id);

    let created = provider
        .put_instance(class::COLLECTION, properties)
        .map_err(|e| match e {
            ProviderError::AlreadyExists(_) => CmgateError::already_exists("Collection", name),
            other => other.into(),
        })?;
    Ok(mapping::collection_id(&created)?)
}

pub fn get_collection_members(provider: &Provider, collection_id: &str) -> Result<Vec<String>> {
    let collection = require_collection(provider, collection_id)?;
    let query = WqlQuery::select(class::FULL_COLLECTION_MEMBERSHIP)
        .properties(&[prop::NAME])
        .filter(Filter::eq(prop::COLLECTION_ID, collection.id.as_str()));
    rows(provider, &query)?
        .iter()
        .map(|row| mapping::member_name(row).map_err(Into::into))
        .collect()
}

fn is_member(provider: &Provider, collection_id: &str, resource_id: ResourceId) -> Result<bool> {
    let query = WqlQuery::select(&class::collection_members(collection_id))
        .properties(&[prop::RESOURCE_ID])
        .filter(Filter::eq(prop::RESOURCE_ID, resource_id));
    Ok(!rows(provider, &query)?.is_empty())
}

pub fn is_device_member(provider: &Provider, collection_id: &str, device_name: &str) -> Result<bool> {
    let collection = require_collection(provider, collection_id)?;
    let device = require_device(provider, device_name)?;
    is_member(provider, &collection.id, device.resource_id)
}

/// Adds or removes a direct membership rule. Returns `false` without touching
/// the site when the requested state already holds.
pub fn add_or_remove_member(
    provider: &Provider,
    collection_id: &str,
    device_name: &str,
    action: MembershipAction,
) -> Result<bool> {
    let collection = require_collection(provider, collection_id)?;
    let device = require_device(provider, device_name)?;
    let present = is_member(provider, &collection.id, device.resource_id)?;

    let method = match (action, present) {
        (MembershipAction::Add, true) | (MembershipAction::Remove, false) => return Ok(false),
        (MembershipAction::Add, false) => "AddMembershipRule",
        (MembershipAction::Remove, true) => "DeleteMembershipRule",
    };

    let rule = PlaneObject::new()
        .with(prop::RESOURCE_CLASS_NAME, class::SYSTEM)
        .with(prop::RESOURCE_ID, device.resource_id.get())
        .with(prop::RULE_NAME, device.name.as_str());
    let params = PlaneObject::new().with(prop::COLLECTION_RULE, rule);
    let path = InstancePath::new(class::COLLECTION, prop::COLLECTION_ID, collection.id.as_str());

    let out = provider.execute_instance_method(&path, method, params)?;
    check_return_value(method, &out)?;
    Ok(true)
}

/// Asks the site to re-evaluate the collection's query rules. Success means the
/// request was accepted, not that membership has been recalculated.
pub fn refresh_membership(provider: &Provider, collection_id: &str) -> Result<()> {
    let collection = require_collection(provider, collection_id)?;
    let path = InstancePath::new(class::COLLECTION, prop::COLLECTION_ID, collection.id.as_str());
    let out = provider.execute_instance_method(&path, "RequestRefresh", PlaneObject::new())?;
    check_return_value("RequestRefresh", &out)
}

// ---------------------------------------------------------------------------
// User device affinity
// ---------------------------------------------------------------------------

fn affinities(provider: &Provider, resource_id: ResourceId) -> Result<Vec<mapping::AffinityRow>> {
    let query = WqlQuery::select(class::USER_MACHINE_RELATIONSHIP)
        .filter(Filter::eq(prop::RESOURCE_ID, resource_id));
    rows(provider, &query)?
        .iter()
        .map(|row| mapping::affinity(row).map_err(Into::into))
        .collect()
}

/// Account names with an administrator-sourced affinity to the device.
pub fn get_primary_users(provider: &Provider, name: &str) -> Result<Vec<String>> {
    let device = require_device(provider, name)?;
    let query = WqlQuery::select(class::USER_MACHINE_RELATIONSHIP)
        .properties(&[prop::UNIQUE_USER_NAME])
        .filter(Filter::eq(prop::RESOURCE_ID, device.resource_id))
        .filter(Filter::eq(prop::SOURCES, AffinitySource::Administrator.code()));
    rows(provider, &query)?
        .iter()
        .map(|row| mapping::unique_user_name(row).map_err(Into::into))
        .collect()
}

pub fn find_user(provider: &Provider, user_name: &str) -> Result<Option<String>> {
    require_name("userName", user_name)?;
    let query = WqlQuery::select(class::USER)
        .properties(&[prop::UNIQUE_USER_NAME])
        .filter(Filter::eq(prop::UNIQUE_USER_NAME, user_name));
    first(provider, &query, mapping::unique_user_name)
}

pub fn set_primary_user(
    provider: &Provider,
    name: &str,
    user_name: &str,
    source: AffinitySource,
) -> Result<()> {
    let device = require_device(provider, name)?;
    let account = find_user(provider, user_name)?
        .ok_or_else(|| CmgateError::not_found("User", user_name))?;

    let params = PlaneObject::new()
        .with(prop::MACHINE_RESOURCE_ID, device.resource_id.get())
        .with(prop::USER_ACCOUNT_NAME, account)
        .with(prop::SOURCE_ID, source.code())
        .with(prop::TYPE_ID, AFFINITY_TYPE_ID);
    let out = provider.execute_method(class::USER_MACHINE_RELATIONSHIP, "CreateRelationship", params)?;
    check_return_value("Create user device affinity", &out)
}

/// Deletes the first affinity whose account ends with the bare form of
/// `user_name`. Returns `false` when nothing matched.
pub fn delete_primary_user(provider: &Provider, name: &str, user_name: &str) -> Result<bool> {
    require_name("userName", user_name)?;
    let device = require_device(provider, name)?;
    let Some(row) = affinities(provider, device.resource_id)?
        .into_iter()
        .find(|row| row.affinity.matches_account(user_name))
    else {
        return Ok(false);
    };
    provider.delete_instance(&InstancePath::new(
        class::USER_MACHINE_RELATIONSHIP,
        prop::RELATIONSHIP_RESOURCE_ID,
        row.relationship_id,
    ))?;
    Ok(true)
}

/// Outcome of [`replace_primary_users`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrimaryUserChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Makes the administrator-sourced affinities equal to `user_names`.
pub fn replace_primary_users(
    provider: &Provider,
    name: &str,
    user_names: &[String],
) -> Result<PrimaryUserChanges> {
    let mut wanted: Vec<&String> = Vec::with_capacity(user_names.len());
    for user_name in user_names {
        if !wanted.iter().any(|w| w.eq_ignore_ascii_case(user_name)) {
            wanted.push(user_name);
        }
    }

    let device = require_device(provider, name)?;
    let current: Vec<mapping::AffinityRow> = affinities(provider, device.resource_id)?
        .into_iter()
        .filter(|row| row.affinity.source == Some(AffinitySource::Administrator))
        .collect();

    let mut changes = PrimaryUserChanges::default();
    for row in &current {
        if !wanted.iter().any(|u| row.affinity.matches_account(u)) {
            provider.delete_instance(&InstancePath::new(
                class::USER_MACHINE_RELATIONSHIP,
                prop::RELATIONSHIP_RESOURCE_ID,
                row.relationship_id,
            ))?;
            changes.removed.push(row.affinity.unique_user_name.clone());
        }
    }
    for user_name in wanted {
        if !current.iter().any(|row| row.affinity.matches_account(user_name)) {
            set_primary_user(provider, &device.name, user_name, AffinitySource::Administrator)?;
            changes.added.push(user_name.clone());
        }
    }
    Ok(changes)
}

// ---------------------------------------------------------------------------
// State migration
// ---------------------------------------------------------------------------

fn association_params(provider: &Provider, source: &str, destination: &str) -> Result<PlaneObject> {
    let source = require_device(provider, source)?;
    let destination = require_device(provider, destination)?;
    Ok(PlaneObject::new()
        .with(prop::SOURCE_CLIENT_RESOURCE_ID, source.resource_id.get())
        .with(prop::RESTORE_CLIENT_RESOURCE_ID, destination.resource_id.get()))
}

pub fn create_migration_association(provider: &Provider, source: &str, destination: &str) -> Result<()> {
    let params = association_params(provider, source, destination)?;
    let out = provider.execute_method(class::STATE_MIGRATION, "AddAssociation", params)?;
    check_return_value("Create migration association", &out)
}

pub fn remove_migration_association(provider: &Provider, source: &str, destination: &str) -> Result<()> {
    let params = association_params(provider, source, destination)?;
    let out = provider.execute_method(class::STATE_MIGRATION, "DeleteAssociation", params)?;
    check_return_value("Delete migration association", &out)
}

pub fn get_migration_status(
    provider: &Provider,
    source: &str,
    destination: &str,
) -> Result<Option<MigrationStatus>> {
    require_name("sourceComputerName", source)?;
    require_name("destinationComputerName", destination)?;
    let query = WqlQuery::select(class::STATE_MIGRATION)
        .properties(&[prop::MIGRATION_STATUS])
        .filter(Filter::eq(prop::SOURCE_NAME, source))
        .filter(Filter::eq(prop::RESTORE_NAME, destination));
    first(provider, &query, mapping::migration_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;

    const GUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn site() -> InMemoryProvider {
        let site = InMemoryProvider::new("PS1");
        site.seed_user("CONTOSO\\jdoe");
        site.seed_user("CONTOSO\\asmith");
        site
    }

    #[test]
    fn test_site_code() {
        assert_eq!(site_code(&site()).unwrap(), "PS1");
    }

    #[test]
    fn test_add_then_find_device() {
        let site = site();
        let id = add_device(&site, "PC01", &HardwareId::smbios_guid(GUID).unwrap()).unwrap();
        let device = find_device(&site, "pc01").unwrap().unwrap();
        assert_eq!(device.resource_id, id);
        assert!(find_device_by_smbios_guid(&site, &HardwareId::smbios_guid(GUID).unwrap())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_add_duplicate_device() {
        let site = site();
        let mac = HardwareId::mac("00-11-22-33-44-55").unwrap();
        add_device(&site, "PC01", &mac).unwrap();
        let err = add_device(&site, "PC02", &mac).unwrap_err();
        assert!(matches!(err, CmgateError::AlreadyExists { .. }));
    }

    #[test]
    fn test_absent_device() {
        let site = site();
        assert!(find_device(&site, "GHOST").unwrap().is_none());
        assert!(require_device(&site, "GHOST").unwrap_err().is_not_found());
        assert_eq!(delete_device(&site, "GHOST").unwrap(), 0);
    }

    #[test]
    fn test_obsolete_records_are_not_live_but_are_deleted() {
        let site = site();
        let stale = site.seed_device("PC01", None);
        site.mark_obsolete(stale);
        site.seed_device("PC01", None);
        let live = find_device(&site, "PC01").unwrap().unwrap();
        assert_ne!(live.resource_id, stale);
        assert_eq!(delete_device(&site, "PC01").unwrap(), 2);
    }

    #[test]
    fn test_unreachable_site_is_not_absence() {
        let site = site();
        site.set_reachable(false);
        let err = find_device(&site, "PC01").unwrap_err();
        assert!(matches!(err, CmgateError::Unavailable { .. }));
    }

    #[test]
    fn test_clear_pxe_flag() {
        let site = site();
        site.seed_device("PC01", None);
        clear_pxe_flag(&site, "PC01").unwrap();

        site.fail_method(class::COLLECTION, "ClearLastNBSAdvForMachines");
        let err = clear_pxe_flag(&site, "PC01").unwrap_err();
        assert!(matches!(err, CmgateError::OperationFailed { .. }));
    }

    #[test]
    fn test_create_collection_requires_limiting_collection() {
        let site = site();
        let id = create_collection(&site, "Pilot", "Pilot devices", "All Systems").unwrap();
        assert!(id.starts_with("PS1"));
        assert_eq!(find_collection_by_name(&site, "Pilot").unwrap().unwrap().id, id);

        let err = create_collection(&site, "Other", "", "Nope").unwrap_err();
        assert!(err.is_not_found());
        let err = create_collection(&site, "Pilot", "", "All Systems").unwrap_err();
        assert!(matches!(err, CmgateError::AlreadyExists { .. }));
    }

    #[test]
    fn test_membership_is_idempotent() {
        let site = site();
        site.seed_device("PC01", None);
        let collection = site.seed_collection("Pilot", None);

        assert!(add_or_remove_member(&site, &collection, "PC01", MembershipAction::Add).unwrap());
        assert!(!add_or_remove_member(&site, &collection, "PC01", MembershipAction::Add).unwrap());
        assert_eq!(site.direct_rules(&collection).len(), 1);
        assert!(is_device_member(&site, &collection, "PC01").unwrap());
        assert_eq!(get_collection_members(&site, &collection).unwrap(), vec!["PC01"]);

        assert!(add_or_remove_member(&site, &collection, "PC01", MembershipAction::Remove).unwrap());
        assert!(!add_or_remove_member(&site, &collection, "PC01", MembershipAction::Remove).unwrap());
        assert!(!is_device_member(&site, &collection, "PC01").unwrap());
    }

    #[test]
    fn test_membership_rejects_injected_collection_id() {
        let site = site();
        site.seed_device("PC01", None);
        let err = is_device_member(&site, "PS1' OR 1=1", "PC01").unwrap_err();
        assert!(matches!(err, CmgateError::InvalidArgument { .. }));
    }

    #[test]
    fn test_refresh_membership() {
        let site = site();
        let collection = site.seed_collection("Pilot", None);
        refresh_membership(&site, &collection).unwrap();
        assert_eq!(site.refresh_requests(&collection), 1);
        assert!(refresh_membership(&site, "PS1FFFFF").unwrap_err().is_not_found());
    }

    #[test]
    fn test_primary_user_set_then_delete_with_domain_prefix() {
        let site = site();
        site.seed_device("PC01", None);
        set_primary_user(&site, "PC01", "CONTOSO\\jdoe", AffinitySource::Administrator).unwrap();
        assert_eq!(get_primary_users(&site, "PC01").unwrap(), vec!["CONTOSO\\jdoe"]);

        assert!(delete_primary_user(&site, "PC01", "OTHER\\jdoe").unwrap());
        assert!(get_primary_users(&site, "PC01").unwrap().is_empty());
        assert!(!delete_primary_user(&site, "PC01", "jdoe").unwrap());
    }

    #[test]
    fn test_set_primary_user_unknown_user() {
        let site = site();
        site.seed_device("PC01", None);
        let err = set_primary_user(&site, "PC01", "CONTOSO\\ghost", AffinitySource::Administrator)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_replace_primary_users() {
        let site = site();
        site.seed_device("PC01", None);
        set_primary_user(&site, "PC01", "CONTOSO\\jdoe", AffinitySource::Administrator).unwrap();

        let changes =
            replace_primary_users(&site, "PC01", &["CONTOSO\\asmith".to_string()]).unwrap();
        assert_eq!(changes.added, vec!["CONTOSO\\asmith"]);
        assert_eq!(changes.removed, vec!["CONTOSO\\jdoe"]);
        assert_eq!(get_primary_users(&site, "PC01").unwrap(), vec!["CONTOSO\\asmith"]);
    }

    #[test]
    fn test_migration_association_lifecycle() {
        let site = site();
        site.seed_device("OLD01", None);
        site.seed_device("NEW01", None);

        assert_eq!(get_migration_status(&site, "OLD01", "NEW01").unwrap(), None);
        create_migration_association(&site, "OLD01", "NEW01").unwrap();
        assert_eq!(
            get_migration_status(&site, "OLD01", "NEW01").unwrap(),
            Some(MigrationStatus::NotStarted)
        );
        remove_migration_association(&site, "OLD01", "NEW01").unwrap();
        assert_eq!(get_migration_status(&site, "OLD01", "NEW01").unwrap(), None);

        let err = create_migration_association(&site, "OLD01", "GHOST").unwrap_err();
        assert!(err.is_not_found());
    }
}
