//! Row-to-record mapping.
//!
//! Every by-name property access on provider rows happens here. The rest of the
//! crate works with the typed records these functions return.

use cmgate_core::{
    AffinitySource, Collection, DeviceRecord, MigrationStatus, ResourceId, UserAffinity,
};

use crate::error::ProviderResult;
use crate::object::PlaneObject;

/// Class names used against the site.
pub mod class {
    pub const SITE: &str = "SMS_Site";
    pub const SYSTEM: &str = "SMS_R_System";
    pub const USER: &str = "SMS_R_User";
    pub const COLLECTION: &str = "SMS_Collection";
    pub const COLLECTION_RULE_DIRECT: &str = "SMS_CollectionRuleDirect";
    pub const FULL_COLLECTION_MEMBERSHIP: &str = "SMS_FullCollectionMembership";
    pub const USER_MACHINE_RELATIONSHIP: &str = "SMS_UserMachineRelationship";
    pub const STATE_MIGRATION: &str = "SMS_StateMigration";

    /// Per-collection materialized membership view.
    #[must_use]
    pub fn collection_members(collection_id: &str) -> String {
        format!("SMS_CM_RES_COLL_{collection_id}")
    }
}

/// Property names used against the site.
pub mod prop {
    pub const SITE_CODE: &str = "SiteCode";
    pub const RESOURCE_ID: &str = "ResourceID";
    pub const NAME: &str = "Name";
    pub const SMS_UNIQUE_IDENTIFIER: &str = "SMSUniqueIdentifier";
    pub const SMBIOS_GUID: &str = "SMBIOSGUID";
    pub const MAC_ADDRESS: &str = "MACAddress";
    pub const NETBIOS_NAME: &str = "NetbiosName";
    pub const OVERWRITE_EXISTING_RECORD: &str = "OverwriteExistingRecord";
    pub const OBSOLETE: &str = "Obsolete";
    pub const RESOURCE_IDS: &str = "ResourceIDs";
    pub const STATUS_CODE: &str = "StatusCode";
    pub const RETURN_VALUE: &str = "ReturnValue";
    pub const COLLECTION_ID: &str = "CollectionID";
    pub const COMMENT: &str = "Comment";
    pub const COLLECTION_TYPE: &str = "CollectionType";
    pub const LIMIT_TO_COLLECTION_ID: &str = "LimitToCollectionID";
    pub const COLLECTION_RULE: &str = "collectionRule";
    pub const RESOURCE_CLASS_NAME: &str = "ResourceClassName";
    pub const RULE_NAME: &str = "RuleName";
    pub const UNIQUE_USER_NAME: &str = "UniqueUserName";
    pub const RESOURCE_NAME: &str = "ResourceName";
    pub const RELATIONSHIP_RESOURCE_ID: &str = "RelationshipResourceID";
    pub const SOURCES: &str = "Sources";
    pub const TYPES: &str = "Types";
    pub const MACHINE_RESOURCE_ID: &str = "MachineResourceId";
    pub const USER_ACCOUNT_NAME: &str = "UserAccountName";
    pub const SOURCE_ID: &str = "SourceId";
    pub const TYPE_ID: &str = "TypeId";
    pub const SOURCE_CLIENT_RESOURCE_ID: &str = "SourceClientResourceID";
    pub const RESTORE_CLIENT_RESOURCE_ID: &str = "RestoreClientResourceID";
    pub const SOURCE_NAME: &str = "SourceName";
    pub const RESTORE_NAME: &str = "RestoreName";
    pub const MIGRATION_STATUS: &str = "MigrationStatus";
}

/// Collection type code for device collections.
pub const DEVICE_COLLECTION_TYPE: i64 = 2;

pub fn device(row: &PlaneObject) -> ProviderResult<DeviceRecord> {
    Ok(DeviceRecord {
        name: row.string(prop::NAME)?,
        resource_id: resource_id(row)?,
        sms_unique_identifier: row.opt_string(prop::SMS_UNIQUE_IDENTIFIER),
    })
}

pub fn resource_id(row: &PlaneObject) -> ProviderResult<ResourceId> {
    row.integer(prop::RESOURCE_ID).map(ResourceId)
}

pub fn collection(row: &PlaneObject) -> ProviderResult<Collection> {
    Ok(Collection {
        id: row.string(prop::COLLECTION_ID)?,
        name: row.string(prop::NAME)?,
        comment: row.opt_string(prop::COMMENT),
        limit_to_collection_id: row.opt_string(prop::LIMIT_TO_COLLECTION_ID),
    })
}

pub fn collection_id(row: &PlaneObject) -> ProviderResult<String> {
    row.string(prop::COLLECTION_ID)
}

/// Device name from a membership row.
pub fn member_name(row: &PlaneObject) -> ProviderResult<String> {
    row.string(prop::NAME)
}

pub fn unique_user_name(row: &PlaneObject) -> ProviderResult<String> {
    row.string(prop::UNIQUE_USER_NAME)
}

/// An affinity row plus the key needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityRow {
    pub relationship_id: i64,
    pub affinity: UserAffinity,
}

pub fn affinity(row: &PlaneObject) -> ProviderResult<AffinityRow> {
    let source = first_integer(row, prop::SOURCES).and_then(AffinitySource::from_code);
    Ok(AffinityRow {
        relationship_id: row.integer(prop::RELATIONSHIP_RESOURCE_ID)?,
        affinity: UserAffinity {
            resource_id: resource_id(row)?,
            unique_user_name: unique_user_name(row)?,
            source,
            type_id: first_integer(row, prop::TYPES).unwrap_or(cmgate_core::AFFINITY_TYPE_ID),
        },
    })
}

pub fn migration_status(row: &PlaneObject) -> ProviderResult<MigrationStatus> {
    row.integer(prop::MIGRATION_STATUS)
        .map(MigrationStatus::from_code)
}

pub fn site_code(row: &PlaneObject) -> ProviderResult<String> {
    row.string(prop::SITE_CODE)
}

/// `ReturnValue` of a method's out-parameters. A missing value counts as success.
#[must_use]
pub fn return_value(out: &PlaneObject) -> i64 {
    out.opt_integer(prop::RETURN_VALUE).unwrap_or(0)
}

/// `StatusCode` of a method's out-parameters. A missing value counts as success.
#[must_use]
pub fn status_code(out: &PlaneObject) -> i64 {
    out.opt_integer(prop::STATUS_CODE).unwrap_or(0)
}

/// Uint32 array properties (`Sources`, `Types`) arrive as arrays from WMI and as
/// scalars from some AdminService views.
fn first_integer(row: &PlaneObject, property: &str) -> Option<i64> {
    match row.get(property)? {
        serde_json::Value::Array(items) => items.iter().find_map(serde_json::Value::as_i64),
        _ => row.opt_integer(property),
    }
}
