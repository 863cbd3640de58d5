//! Domain values shared by the plane clients and the HTTP edge.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::{CmgateError, Result};

/// Management-plane numeric identifier for a device. Immutable for the
/// lifetime of the device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl ResourceId {
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of hardware identifier used when importing a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdKind {
    Mac,
    SmbiosGuid,
}

/// A validated hardware identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareId {
    kind: IdKind,
    value: String,
}

impl HardwareId {
    /// Parses a MAC address in `-` or `:` form and normalizes it to colon form.
    pub fn mac(raw: &str) -> Result<Self> {
        let normalized = raw.trim().replace('-', ":");
        let groups: Vec<&str> = normalized.split(':').collect();
        let well_formed = groups.len() == 6
            && groups
                .iter()
                .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(CmgateError::invalid_argument(
                "macAddress",
                format!("'{raw}' is not a MAC address"),
            ));
        }
        Ok(Self {
            kind: IdKind::Mac,
            value: normalized,
        })
    }

    /// Parses an SMBIOS GUID in hyphenated 8-4-4-4-12 form.
    pub fn smbios_guid(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() != 36 || uuid::Uuid::try_parse(raw).is_err() {
            return Err(CmgateError::invalid_argument(
                "biosGuid",
                format!("'{raw}' is not a GUID"),
            ));
        }
        Ok(Self {
            kind: IdKind::SmbiosGuid,
            value: raw.to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> IdKind {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A device row as the management plane reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub name: String,
    pub resource_id: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_unique_identifier: Option<String>,
}

/// A device collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_collection_id: Option<String>,
}

/// Direction of a direct-membership-rule change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Add,
    Remove,
}

/// Source recorded on a user-device affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffinitySource {
    SoftwareCatalog,
    Administrator,
    User,
    UsageAgent,
    DeviceManagement,
    Osd,
    FastInstall,
    ExchangeConnector,
}

impl AffinitySource {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::SoftwareCatalog => 1,
            Self::Administrator => 2,
            Self::User => 3,
            Self::UsageAgent => 4,
            Self::DeviceManagement => 5,
            Self::Osd => 6,
            Self::FastInstall => 7,
            Self::ExchangeConnector => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Self::SoftwareCatalog,
            2 => Self::Administrator,
            3 => Self::User,
            4 => Self::UsageAgent,
            5 => Self::DeviceManagement,
            6 => Self::Osd,
            7 => Self::FastInstall,
            8 => Self::ExchangeConnector,
            _ => return None,
        })
    }
}

/// Relationship type flag the plane expects on every affinity we create.
pub const AFFINITY_TYPE_ID: i64 = 1;

/// A user-device affinity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAffinity {
    pub resource_id: ResourceId,
    pub unique_user_name: String,
    pub source: Option<AffinitySource>,
    pub type_id: i64,
}

impl UserAffinity {
    /// True when the account name ends with the bare form of `user_name`,
    /// ignoring case. `DOMAIN\jdoe` is reduced to `jdoe` before matching.
    #[must_use]
    pub fn matches_account(&self, user_name: &str) -> bool {
        let bare = bare_account_name(user_name).to_lowercase();
        !bare.is_empty() && self.unique_user_name.to_lowercase().ends_with(&bare)
    }
}

/// Strips a `DOMAIN\` qualifier, keeping the component after the last `\`.
#[must_use]
pub fn bare_account_name(user_name: &str) -> &str {
    user_name.rsplit('\\').next().unwrap_or(user_name)
}

/// State-migration progress for a source/restore pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    NotStarted,
    InProgress,
    Completed,
    Unknown,
}

impl MigrationStatus {
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::NotStarted,
            1 => Self::InProgress,
            2 => Self::Completed,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// A state-migration association between two devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationAssociation {
    pub source_name: String,
    pub restore_name: String,
    pub status: MigrationStatus,
}
