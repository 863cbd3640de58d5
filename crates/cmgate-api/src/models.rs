//! Request and response DTOs.
//!
//! JSON bodies use camelCase. Requests are validated with `validator` before
//! reaching a service; see [`ValidatedJson`].

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::LazyLock;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

static GUID_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
});

static MAC_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$"));

fn is_match_of(re: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> bool {
    re.as_ref().is_ok_and(|re| re.is_match(value))
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_guid(value: &str) -> Result<(), ValidationError> {
    if is_match_of(&GUID_RE, value) {
        Ok(())
    } else {
        Err(invalid("invalid_guid", "Invalid BIOS GUID format"))
    }
}

fn validate_mac(value: &str) -> Result<(), ValidationError> {
    if is_match_of(&MAC_RE, value) {
        Ok(())
    } else {
        Err(invalid("invalid_mac", "Invalid MAC address format"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("blank", "Value must not be blank"))
    } else {
        Ok(())
    }
}

fn validate_user_list(users: &[String]) -> Result<(), ValidationError> {
    if users.iter().any(|u| u.trim().is_empty()) {
        Err(invalid("blank_user", "User names must not be blank"))
    } else {
        Ok(())
    }
}

/// Flattens validator output into envelope `errors`, sorted by field.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field}: {}", e.code),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// JSON body that is deserialized and then validated. Both failures become a
/// 400 envelope listing what was wrong.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation(vec![rejection.body_text()]))?;
        value
            .validate()
            .map_err(|e| ApiError::Validation(validation_messages(&e)))?;
        Ok(Self(value))
    }
}

// ---------------------------------------------------------------------------
// Computer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddComputerByBiosGuidRequest {
    #[validate(
        length(min = 1, max = 255, message = "Computer name must be between 1 and 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub computer_name: String,
    #[validate(custom(function = "validate_guid"))]
    pub bios_guid: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddComputerByMacRequest {
    #[validate(
        length(min = 1, max = 255, message = "Computer name must be between 1 and 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub computer_name: String,
    #[validate(custom(function = "validate_mac"))]
    pub mac_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputerExistsResponse {
    pub exists: bool,
    pub computer_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputerDetailsResponse {
    pub computer_name: String,
    pub resource_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_guid: Option<String>,
}

/// Existence check by an identifier other than the name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLookupResponse {
    pub exists: bool,
    pub identifier: String,
}

/// Accepts a GUID path segment, rejecting anything else before a plane call.
pub fn check_guid(value: &str) -> Result<(), ApiError> {
    validate_guid(value).map_err(|_| ApiError::Validation(vec!["Invalid GUID format".to_string()]))
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[validate(
        length(min = 1, max = 255, message = "Collection name is required"),
        custom(function = "validate_not_blank")
    )]
    pub collection_name: String,
    #[serde(default)]
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Limiting collection name is required"))]
    pub limiting_collection_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCreatedResponse {
    pub collection_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CollectionQuery {
    #[validate(length(min = 1, message = "Collection name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub collection_id: String,
    pub collection_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMemberRequest {
    #[validate(length(min = 1, max = 255, message = "Computer name is required"))]
    pub computer_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMembersResponse {
    pub collection_id: String,
    pub members: Vec<String>,
}

/// Collection or group membership check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub is_member: bool,
    pub status: &'static str,
}

impl MembershipResponse {
    #[must_use]
    pub fn new(is_member: bool) -> Self {
        Self {
            is_member,
            status: if is_member { "MEMBER" } else { "NOT_MEMBER" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChangeResponse {
    /// False when membership already was in the requested state.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// User affinity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPrimaryUserRequest {
    #[validate(length(min = 1, max = 255, message = "Computer name is required"))]
    pub computer_name: String,
    #[validate(
        length(min = 1, message = "User name is required"),
        custom(function = "validate_not_blank")
    )]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePrimaryUsersRequest {
    #[validate(
        length(min = 1, message = "At least one user is required"),
        custom(function = "validate_user_list")
    )]
    pub user_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryUsersResponse {
    pub computer_name: String,
    pub primary_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryUsersChangedResponse {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

// ---------------------------------------------------------------------------
// USMT
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UsmtAssociationRequest {
    #[validate(length(min = 1, max = 255, message = "Source computer name is required"))]
    pub source_computer_name: String,
    #[validate(length(min = 1, max = 255, message = "Destination computer name is required"))]
    pub destination_computer_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsmtMigrationStatusResponse {
    pub source_computer_name: String,
    pub destination_computer_name: String,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Entra ID
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EntraComputerGroupRequest {
    #[validate(length(min = 1, max = 255, message = "Computer name is required"))]
    pub computer_name: String,
    #[validate(length(min = 1, message = "Group name is required"))]
    pub group_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EntraUserGroupRequest {
    #[validate(
        length(min = 1, message = "SAM account name is required"),
        custom(function = "validate_not_blank")
    )]
    pub sam_account_name: String,
    #[validate(length(min = 1, message = "Group name is required"))]
    pub group_name: String,
}

// ---------------------------------------------------------------------------
// Intune
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntuneDeviceExistsResponse {
    pub exists: bool,
    pub status: &'static str,
}

impl IntuneDeviceExistsResponse {
    #[must_use]
    pub fn new(exists: bool) -> Self {
        Self {
            exists,
            status: if exists { "EXISTS" } else { "NOT_FOUND" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoManagedStatusResponse {
    pub is_co_managed: bool,
    pub status: &'static str,
}

impl CoManagedStatusResponse {
    #[must_use]
    pub fn new(is_co_managed: bool) -> Self {
        Self {
            is_co_managed,
            status: if is_co_managed { "CO_MANAGED" } else { "NOT_CO_MANAGED" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntunePrimaryUserResponse {
    pub computer_name: String,
    pub user_principal_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IntunePrimaryUserRequest {
    #[validate(length(min = 1, max = 255, message = "Computer name is required"))]
    pub computer_name: String,
    #[validate(
        length(min = 1, message = "User name is required"),
        custom(function = "validate_not_blank")
    )]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Computer name is required"))]
    pub computer_name: String,
    #[validate(length(min = 1, message = "Device category name is required"))]
    pub device_category_name: String,
}
