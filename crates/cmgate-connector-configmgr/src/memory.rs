//! A simulated ConfigMgr site held in memory.
//!
//! Behaves like the SMS provider for the classes and methods cmgate uses:
//! duplicate imports are rejected, collection views are derived from direct
//! rules, and membership queries against unknown collections fail with an
//! invalid-class error. Used by tests and for running the gateway without a
//! site.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cmgate_core::ResourceId;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::mapping::{class, prop};
use crate::object::{InstancePath, PlaneObject};
use crate::provider::ManagementProvider;
use crate::query::{Filter, QueryValue, WqlQuery};

/// Built-in collection every device belongs to.
pub const ALL_SYSTEMS_ID: &str = "SMS00001";
const ALL_SYSTEMS_NAME: &str = "All Systems";
const FIRST_RESOURCE_ID: i64 = 16_777_220;
const FIRST_RELATIONSHIP_ID: i64 = 25_165_825;
const FIRST_COLLECTION_SEQUENCE: u32 = 0x10;

#[derive(Debug)]
struct SiteState {
    site_code: String,
    reachable: bool,
    next_resource_id: i64,
    next_relationship_id: i64,
    next_collection_sequence: u32,
    devices: Vec<PlaneObject>,
    users: Vec<PlaneObject>,
    collections: Vec<PlaneObject>,
    relationships: Vec<PlaneObject>,
    migrations: Vec<PlaneObject>,
    /// Direct membership rules: collection id -> resource ids.
    rules: BTreeMap<String, BTreeSet<i64>>,
    refresh_requests: BTreeMap<String, u32>,
    /// `class.method` pairs forced to report a non-zero status.
    failing_methods: HashSet<String>,
}

/// In-memory [`ManagementProvider`].
#[derive(Debug)]
pub struct InMemoryProvider {
    state: Mutex<SiteState>,
}

impl InMemoryProvider {
    /// An empty site containing only the built-in "All Systems" collection.
    #[must_use]
    pub fn new(site_code: &str) -> Self {
        let all_systems = PlaneObject::new()
            .with(prop::COLLECTION_ID, ALL_SYSTEMS_ID)
            .with(prop::NAME, ALL_SYSTEMS_NAME)
            .with(prop::COMMENT, "All Systems")
            .with(prop::COLLECTION_TYPE, 2);
        Self {
            state: Mutex::new(SiteState {
                site_code: site_code.to_uppercase(),
                reachable: true,
                next_resource_id: FIRST_RESOURCE_ID,
                next_relationship_id: FIRST_RELATIONSHIP_ID,
                next_collection_sequence: FIRST_COLLECTION_SEQUENCE,
                devices: Vec::new(),
                users: Vec::new(),
                collections: vec![all_systems],
                relationships: Vec::new(),
                migrations: Vec::new(),
                rules: BTreeMap::new(),
                refresh_requests: BTreeMap::new(),
                failing_methods: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connected(&self) -> ProviderResult<MutexGuard<'_, SiteState>> {
        let state = self.lock();
        if !state.reachable {
            return Err(ProviderError::Unreachable(format!(
                "site {} is not responding",
                state.site_code
            )));
        }
        Ok(state)
    }

    /// Adds a discovered device and returns its resource id.
    pub fn seed_device(&self, name: &str, smbios_guid: Option<&str>) -> ResourceId {
        let mut state = self.lock();
        state.insert_device(name, None, smbios_guid)
    }

    /// Flags a device record as obsolete, as the site does after a re-import.
    pub fn mark_obsolete(&self, resource_id: ResourceId) {
        let mut state = self.lock();
        let filter = Filter::eq(prop::RESOURCE_ID, resource_id);
        for row in state.devices.iter_mut().filter(|r| filter.matches(r)) {
            row.set(prop::OBSOLETE, 1);
        }
    }

    pub fn seed_user(&self, unique_user_name: &str) {
        let mut state = self.lock();
        let row = PlaneObject::new()
            .with(prop::UNIQUE_USER_NAME, unique_user_name)
            .with(prop::NAME, unique_user_name);
        state.users.push(row);
    }

    /// Adds a collection limited to `limit_to` (default "All Systems") and
    /// returns its id.
    pub fn seed_collection(&self, name: &str, limit_to: Option<&str>) -> String {
        let mut state = self.lock();
        let id = state.next_collection_id();
        let row = PlaneObject::new()
            .with(prop::COLLECTION_ID, id.as_str())
            .with(prop::NAME, name)
            .with(prop::COLLECTION_TYPE, 2)
            .with(prop::LIMIT_TO_COLLECTION_ID, limit_to.unwrap_or(ALL_SYSTEMS_ID));
        state.collections.push(row);
        id
    }

    /// Records a migration between two existing devices with a raw status code.
    pub fn seed_migration(&self, source: &str, restore: &str, status: i64) {
        let mut state = self.lock();
        let source_id = state.device_id_by_name(source).unwrap_or_default();
        let restore_id = state.device_id_by_name(restore).unwrap_or_default();
        state.migrations.push(
            PlaneObject::new()
                .with(prop::SOURCE_CLIENT_RESOURCE_ID, source_id)
                .with(prop::RESTORE_CLIENT_RESOURCE_ID, restore_id)
                .with(prop::SOURCE_NAME, source)
                .with(prop::RESTORE_NAME, restore)
                .with(prop::MIGRATION_STATUS, status),
        );
    }

    /// Simulates losing (or regaining) the connection to the site.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Makes `class.method` report a non-zero status from now on.
    pub fn fail_method(&self, class: &str, method: &str) {
        self.lock()
            .failing_methods
            .insert(method_key(class, method));
    }

    /// Number of refresh requests accepted for a collection.
    #[must_use]
    pub fn refresh_requests(&self, collection_id: &str) -> u32 {
        self.lock()
            .refresh_requests
            .get(&collection_id.to_uppercase())
            .copied()
            .unwrap_or(0)
    }

    /// Direct membership rules currently attached to a collection.
    #[must_use]
    pub fn direct_rules(&self, collection_id: &str) -> Vec<ResourceId> {
        self.lock()
            .rules
            .get(&collection_id.to_uppercase())
            .map(|ids| ids.iter().copied().map(ResourceId).collect())
            .unwrap_or_default()
    }
}

fn method_key(class: &str, method: &str) -> String {
    format!("{}.{}", class.to_lowercase(), method.to_lowercase())
}

fn invalid_method(class: &str, method: &str, message: &str) -> ProviderError {
    ProviderError::MethodFailed {
        class: class.to_string(),
        method: method.to_string(),
        message: message.to_string(),
    }
}

fn status(code: i64) -> PlaneObject {
    PlaneObject::new().with(prop::RETURN_VALUE, code)
}

fn project(row: &PlaneObject, properties: &[String]) -> PlaneObject {
    if properties.is_empty() {
        return row.clone();
    }
    let mut projected = PlaneObject::new();
    for property in properties {
        if let Some(value) = row.get(property) {
            projected.set(property, value.clone());
        }
    }
    projected
}

fn remove_where(rows: &mut Vec<PlaneObject>, filter: &Filter) -> usize {
    let before = rows.len();
    rows.retain(|row| !filter.matches(row));
    before - rows.len()
}

impl SiteState {
    fn next_collection_id(&mut self) -> String {
        let id = format!("{}{:05X}", self.site_code, self.next_collection_sequence);
        self.next_collection_sequence += 1;
        id
    }

    fn insert_device(&mut self, name: &str, mac: Option<&str>, smbios_guid: Option<&str>) -> ResourceId {
        let resource_id = self.next_resource_id;
        self.next_resource_id += 1;
        let mut row = PlaneObject::new()
            .with(prop::RESOURCE_ID, resource_id)
            .with(prop::NAME, name)
            .with(
                prop::SMS_UNIQUE_IDENTIFIER,
                format!("GUID:{}", uuid::Uuid::new_v4().to_string().to_uppercase()),
            )
            .with(prop::OBSOLETE, 0);
        if let Some(mac) = mac {
            row.set("MACAddresses", json!([mac]));
        }
        if let Some(guid) = smbios_guid {
            row.set(prop::SMBIOS_GUID, guid);
        }
        self.devices.push(row);
        ResourceId(resource_id)
    }

    fn live_device(&self, filter: &Filter) -> Option<&PlaneObject> {
        let live = Filter::zero_or_null(prop::OBSOLETE);
        self.devices
            .iter()
            .find(|row| live.matches(row) && filter.matches(row))
    }

    fn device_id_by_name(&self, name: &str) -> Option<i64> {
        self.live_device(&Filter::eq(prop::NAME, name))
            .and_then(|row| row.opt_integer(prop::RESOURCE_ID))
    }

    fn device_exists(&self, resource_id: i64) -> bool {
        self.live_device(&Filter::eq(prop::RESOURCE_ID, resource_id))
            .is_some()
    }

    fn collection(&self, collection_id: &str) -> Option<&PlaneObject> {
        let filter = Filter::eq(prop::COLLECTION_ID, collection_id);
        self.collections.iter().find(|row| filter.matches(row))
    }

    /// Materialized membership rows (`ResourceID`, `Name`) for a collection.
    fn members(&self, collection_id: &str) -> Vec<PlaneObject> {
        let live = Filter::zero_or_null(prop::OBSOLETE);
        let rules = self.rules.get(&collection_id.to_uppercase());
        self.devices
            .iter()
            .filter(|row| live.matches(row))
            .filter(|row| {
                collection_id.eq_ignore_ascii_case(ALL_SYSTEMS_ID)
                    || row
                        .opt_integer(prop::RESOURCE_ID)
                        .is_some_and(|id| rules.is_some_and(|r| r.contains(&id)))
            })
            .map(|row| {
                PlaneObject::new()
                    .with(prop::RESOURCE_ID, row.get(prop::RESOURCE_ID).cloned().unwrap_or(Value::Null))
                    .with(prop::NAME, row.get(prop::NAME).cloned().unwrap_or(Value::Null))
            })
            .collect()
    }

    fn table(&self, class_name: &str) -> ProviderResult<Vec<PlaneObject>> {
        let lower = class_name.to_lowercase();
        let rows = match lower.as_str() {
            "sms_site" => vec![PlaneObject::new().with(prop::SITE_CODE, self.site_code.as_str())],
            "sms_r_system" => self.devices.clone(),
            "sms_r_user" => self.users.clone(),
            "sms_collection" => self.collections.clone(),
            "sms_usermachinerelationship" => self.relationships.clone(),
            "sms_statemigration" => self.migrations.clone(),
            "sms_fullcollectionmembership" => self
                .collections
                .iter()
                .filter_map(|c| c.opt_string(prop::COLLECTION_ID))
                .flat_map(|id| {
                    self.members(&id)
                        .into_iter()
                        .map(move |row| row.with(prop::COLLECTION_ID, id.as_str()))
                })
                .collect(),
            view if view.starts_with("sms_cm_res_coll_") => {
                let collection_id = class_name.get("SMS_CM_RES_COLL_".len()..).unwrap_or_default();
                if self.collection(collection_id).is_none() {
                    return Err(ProviderError::InvalidQuery(format!("Invalid class {class_name}")));
                }
                self.members(collection_id)
            }
            _ => return Err(ProviderError::InvalidQuery(format!("Invalid class {class_name}"))),
        };
        Ok(rows)
    }

    fn forced_failure(&self, class: &str, method: &str) -> bool {
        self.failing_methods.contains(&method_key(class, method))
    }

    fn import_machine_entry(&mut self, params: &PlaneObject) -> ProviderResult<PlaneObject> {
        let name = params.string(prop::NETBIOS_NAME)?;
        let mac = params.opt_string(prop::MAC_ADDRESS);
        let guid = params.opt_string(prop::SMBIOS_GUID);
        if mac.is_none() && guid.is_none() {
            return Err(invalid_method(
                class::SITE,
                "ImportMachineEntry",
                "Invalid parameter: MACAddress or SMBIOSGUID is required",
            ));
        }

        let mut duplicate = Filter::eq(prop::NAME, name.as_str());
        if let Some(guid) = &guid {
            duplicate = Filter::Or(vec![duplicate, Filter::eq(prop::SMBIOS_GUID, guid.as_str())]);
        }
        if let Some(mac) = &mac {
            duplicate = Filter::Or(vec![duplicate, Filter::eq("MACAddresses", mac.as_str())]);
        }
        if self.live_device(&duplicate).is_some() {
            return Err(ProviderError::AlreadyExists(name));
        }

        let resource_id = self.insert_device(&name, mac.as_deref(), guid.as_deref());
        Ok(status(0).with(prop::RESOURCE_ID, resource_id.get()))
    }

    fn clear_pxe(&self, params: &PlaneObject) -> PlaneObject {
        let ids: Vec<i64> = match params.get(prop::RESOURCE_IDS) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            _ => Vec::new(),
        };
        let ok = !ids.is_empty() && ids.iter().all(|id| self.device_exists(*id));
        PlaneObject::new().with(prop::STATUS_CODE, i64::from(!ok))
    }

    fn create_relationship(&mut self, params: &PlaneObject) -> ProviderResult<PlaneObject> {
        let resource_id = params.integer(prop::MACHINE_RESOURCE_ID)?;
        let account = params.string(prop::USER_ACCOUNT_NAME)?;
        let source = params.integer(prop::SOURCE_ID)?;
        let type_id = params.integer(prop::TYPE_ID)?;

        let Some(device_name) = self
            .live_device(&Filter::eq(prop::RESOURCE_ID, resource_id))
            .and_then(|row| row.opt_string(prop::NAME))
        else {
            return Ok(status(1));
        };

        let existing = Filter::eq(prop::RESOURCE_ID, resource_id)
            .and(Filter::eq(prop::UNIQUE_USER_NAME, account.as_str()));
        if let Some(row) = self.relationships.iter_mut().find(|r| existing.matches(r)) {
            let mut sources: Vec<i64> = match row.get(prop::SOURCES) {
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
                _ => Vec::new(),
            };
            if !sources.contains(&source) {
                sources.push(source);
                row.set(prop::SOURCES, json!(sources));
            }
            return Ok(status(0));
        }

        let relationship_id = self.next_relationship_id;
        self.next_relationship_id += 1;
        self.relationships.push(
            PlaneObject::new()
                .with(prop::RELATIONSHIP_RESOURCE_ID, relationship_id)
                .with(prop::RESOURCE_ID, resource_id)
                .with(prop::RESOURCE_NAME, device_name)
                .with(prop::UNIQUE_USER_NAME, account)
                .with(prop::SOURCES, json!([source]))
                .with(prop::TYPES, json!([type_id])),
        );
        Ok(status(0))
    }

    fn association_pair(params: &PlaneObject) -> ProviderResult<(i64, i64)> {
        Ok((
            params.integer(prop::SOURCE_CLIENT_RESOURCE_ID)?,
            params.integer(prop::RESTORE_CLIENT_RESOURCE_ID)?,
        ))
    }

    fn add_association(&mut self, params: &PlaneObject) -> ProviderResult<PlaneObject> {
        let (source, restore) = Self::association_pair(params)?;
        let names = (
            self.live_device(&Filter::eq(prop::RESOURCE_ID, source))
                .and_then(|r| r.opt_string(prop::NAME)),
            self.live_device(&Filter::eq(prop::RESOURCE_ID, restore))
                .and_then(|r| r.opt_string(prop::NAME)),
        );
        let (Some(source_name), Some(restore_name)) = names else {
            return Ok(status(1));
        };

        let pair = Filter::eq(prop::SOURCE_CLIENT_RESOURCE_ID, source)
            .and(Filter::eq(prop::RESTORE_CLIENT_RESOURCE_ID, restore));
        if !self.migrations.iter().any(|r| pair.matches(r)) {
            self.migrations.push(
                PlaneObject::new()
                    .with(prop::SOURCE_CLIENT_RESOURCE_ID, source)
                    .with(prop::RESTORE_CLIENT_RESOURCE_ID, restore)
                    .with(prop::SOURCE_NAME, source_name)
                    .with(prop::RESTORE_NAME, restore_name)
                    .with(prop::MIGRATION_STATUS, 0),
            );
        }
        Ok(status(0))
    }

    fn delete_association(&mut self, params: &PlaneObject) -> ProviderResult<PlaneObject> {
        let (source, restore) = Self::association_pair(params)?;
        let pair = Filter::eq(prop::SOURCE_CLIENT_RESOURCE_ID, source)
            .and(Filter::eq(prop::RESTORE_CLIENT_RESOURCE_ID, restore));
        let removed = remove_where(&mut self.migrations, &pair);
        Ok(status(i64::from(removed == 0)))
    }
}

impl ManagementProvider for InMemoryProvider {
    fn kind(&self) -> &'static str {
        "in_memory"
    }

    fn query(&self, query: &WqlQuery) -> ProviderResult<Vec<PlaneObject>> {
        let state = self.connected()?;
        let rows = state.table(&query.class)?;
        Ok(rows
            .iter()
            .filter(|row| query.matches(row))
            .map(|row| project(row, &query.properties))
            .collect())
    }

    fn execute_method(
        &self,
        class_name: &str,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject> {
        let mut state = self.connected()?;
        debug!(class = class_name, method, "Simulated site method");
        if state.forced_failure(class_name, method) {
            let mut out = status(1);
            out.set(prop::STATUS_CODE, 1);
            return Ok(out);
        }
        match (class_name.to_lowercase().as_str(), method.to_lowercase().as_str()) {
            ("sms_site", "importmachineentry") => state.import_machine_entry(&params),
            ("sms_collection", "clearlastnbsadvformachines") => Ok(state.clear_pxe(&params)),
            ("sms_usermachinerelationship", "createrelationship") => {
                state.create_relationship(&params)
            }
            ("sms_statemigration", "addassociation") => state.add_association(&params),
            ("sms_statemigration", "deleteassociation") => state.delete_association(&params),
            _ => Err(invalid_method(class_name, method, "Invalid method")),
        }
    }

    fn execute_instance_method(
        &self,
        path: &InstancePath,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject> {
        let mut state = self.connected()?;
        if !path.class.eq_ignore_ascii_case(class::COLLECTION) {
            return Err(invalid_method(&path.class, method, "Invalid method"));
        }
        let filter = Filter::eq(&path.key, path.value.clone());
        let Some(collection_id) = state
            .collections
            .iter()
            .find(|row| filter.matches(row))
            .and_then(|row| row.opt_string(prop::COLLECTION_ID))
        else {
            return Err(ProviderError::InstanceNotFound(path.to_string()));
        };
        if state.forced_failure(&path.class, method) {
            return Ok(status(1));
        }

        let key = collection_id.to_uppercase();
        match method.to_lowercase().as_str() {
            "addmembershiprule" | "deletemembershiprule" => {
                let rule = match params.get(prop::COLLECTION_RULE) {
                    Some(Value::Object(map)) => PlaneObject::from(map.clone()),
                    _ => return Err(invalid_method(&path.class, method, "Invalid parameter: collectionRule")),
                };
                let resource_id = rule.integer(prop::RESOURCE_ID)?;
                if method.eq_ignore_ascii_case("AddMembershipRule") {
                    if !state.device_exists(resource_id) {
                        return Err(invalid_method(&path.class, method, "Resource does not exist"));
                    }
                    state.rules.entry(key).or_default().insert(resource_id);
                } else if let Some(ids) = state.rules.get_mut(&key) {
                    ids.remove(&resource_id);
                }
                Ok(status(0))
            }
            "requestrefresh" => {
                *state.refresh_requests.entry(key).or_default() += 1;
                Ok(status(0))
            }
            _ => Err(invalid_method(&path.class, method, "Invalid method")),
        }
    }

    fn put_instance(&self, class_name: &str, properties: PlaneObject) -> ProviderResult<PlaneObject> {
        let mut state = self.connected()?;
        if !class_name.eq_ignore_ascii_case(class::COLLECTION) {
            return Err(ProviderError::InvalidQuery(format!(
                "put is not supported for {class_name}"
            )));
        }
        let name = properties.string(prop::NAME)?;
        if state
            .collections
            .iter()
            .any(|row| Filter::eq(prop::NAME, name.as_str()).matches(row))
        {
            return Err(ProviderError::AlreadyExists(name));
        }
        if let Some(limit) = properties.opt_string(prop::LIMIT_TO_COLLECTION_ID) {
            if state.collection(&limit).is_none() {
                return Err(invalid_method(class_name, "Put", "Limiting collection does not exist"));
            }
        }

        let id = state.next_collection_id();
        let stored = properties.with(prop::COLLECTION_ID, id.as_str());
        state.collections.push(stored.clone());
        Ok(stored)
    }

    fn delete_instance(&self, path: &InstancePath) -> ProviderResult<()> {
        let mut state = self.connected()?;
        let filter = Filter::eq(&path.key, path.value.clone());
        let removed = match path.class.to_lowercase().as_str() {
            "sms_r_system" => {
                let ids: Vec<i64> = state
                    .devices
                    .iter()
                    .filter(|row| filter.matches(row))
                    .filter_map(|row| row.opt_integer(prop::RESOURCE_ID))
                    .collect();
                for id in &ids {
                    for rules in state.rules.values_mut() {
                        rules.remove(id);
                    }
                    remove_where(&mut state.relationships, &Filter::eq(prop::RESOURCE_ID, *id));
                }
                remove_where(&mut state.devices, &filter)
            }
            "sms_usermachinerelationship" => remove_where(&mut state.relationships, &filter),
            "sms_collection" => {
                if let QueryValue::Str(id) = &path.value {
                    state.rules.remove(&id.to_uppercase());
                }
                remove_where(&mut state.collections, &filter)
            }
            "sms_statemigration" => remove_where(&mut state.migrations, &filter),
            _ => 0,
        };
        if removed == 0 {
            return Err(ProviderError::InstanceNotFound(path.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(provider: &InMemoryProvider, name: &str, guid: &str) -> ProviderResult<PlaneObject> {
        provider.execute_method(
            class::SITE,
            "ImportMachineEntry",
            PlaneObject::new()
                .with(prop::NETBIOS_NAME, name)
                .with(prop::SMBIOS_GUID, guid)
                .with(prop::OVERWRITE_EXISTING_RECORD, false),
        )
    }

    #[test]
    fn test_import_assigns_sequential_resource_ids() {
        let site = InMemoryProvider::new("PS1");
        let first = import(&site, "PC01", "123e4567-e89b-12d3-a456-426614174000").unwrap();
        let second = import(&site, "PC02", "123e4567-e89b-12d3-a456-426614174001").unwrap();
        assert_eq!(first.integer(prop::RESOURCE_ID).unwrap(), FIRST_RESOURCE_ID);
        assert_eq!(second.integer(prop::RESOURCE_ID).unwrap(), FIRST_RESOURCE_ID + 1);
    }

    #[test]
    fn test_duplicate_import_is_rejected() {
        let site = InMemoryProvider::new("PS1");
        import(&site, "PC01", "123e4567-e89b-12d3-a456-426614174000").unwrap();
        let err = import(&site, "pc01", "123e4567-e89b-12d3-a456-426614174009").unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
    }

    #[test]
    fn test_unreachable_site() {
        let site = InMemoryProvider::new("PS1");
        site.set_reachable(false);
        let err = site.query(&WqlQuery::select(class::SITE)).unwrap_err();
        assert!(matches!(err, ProviderError::Unreachable(_)));
    }

    #[test]
    fn test_unknown_collection_view_is_invalid_class() {
        let site = InMemoryProvider::new("PS1");
        let err = site
            .query(&WqlQuery::select(&class::collection_members("PS1FFFFF")))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidQuery(_)));
    }

    #[test]
    fn test_all_systems_contains_every_live_device() {
        let site = InMemoryProvider::new("PS1");
        site.seed_device("PC01", None);
        let stale = site.seed_device("PC02", None);
        site.mark_obsolete(stale);
        let rows = site
            .query(&WqlQuery::select(&class::collection_members(ALL_SYSTEMS_ID)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].string(prop::NAME).unwrap(), "PC01");
    }

    #[test]
    fn test_put_collection_assigns_site_prefixed_id() {
        let site = InMemoryProvider::new("PS1");
        let stored = site
            .put_instance(
                class::COLLECTION,
                PlaneObject::new()
                    .with(prop::NAME, "Workstations")
                    .with(prop::LIMIT_TO_COLLECTION_ID, ALL_SYSTEMS_ID),
            )
            .unwrap();
        assert_eq!(stored.string(prop::COLLECTION_ID).unwrap(), "PS100010");
    }

    #[test]
    fn test_delete_device_purges_rules() {
        let site = InMemoryProvider::new("PS1");
        let id = site.seed_device("PC01", None);
        let collection = site.seed_collection("Pilot", None);
        site.execute_instance_method(
            &InstancePath::new(class::COLLECTION, prop::COLLECTION_ID, collection.as_str()),
            "AddMembershipRule",
            PlaneObject::new().with(
                prop::COLLECTION_RULE,
                PlaneObject::new().with(prop::RESOURCE_ID, id.get()),
            ),
        )
        .unwrap();
        assert_eq!(site.direct_rules(&collection), vec![id]);

        site.delete_instance(&InstancePath::new(class::SYSTEM, prop::RESOURCE_ID, id))
            .unwrap();
        assert!(site.direct_rules(&collection).is_empty());
        assert!(matches!(
            site.delete_instance(&InstancePath::new(class::SYSTEM, prop::RESOURCE_ID, id)),
            Err(ProviderError::InstanceNotFound(_))
        ));
    }
}
