//! Entra ID group endpoints.
//!
//! - POST /entra/group/add-computer
//! - POST /entra/group/remove-computer
//! - POST /entra/group/add-user
//! - POST /entra/group/remove-user
//! - GET /entra/group/:groupName/computers/:computerName

use axum::{extract::Path, http::StatusCode, Extension};
use std::sync::Arc;

use super::MSG_SUCCESS;
use crate::auth::Principal;
use crate::error::ApiResult;
use crate::models::{
    EntraComputerGroupRequest, EntraUserGroupRequest, MembershipChangeResponse,
    MembershipResponse, ValidatedJson,
};
use crate::response::ApiResponse;
use crate::services::DirectoryService;

const MSG_GROUP_UPDATED: &str = "Group membership updated successfully";

fn changed(changed: bool) -> ApiResult<MembershipChangeResponse> {
    Ok((
        StatusCode::OK,
        ApiResponse::ok(MembershipChangeResponse { changed }, MSG_GROUP_UPDATED),
    ))
}

pub async fn add_computer_to_group(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<EntraComputerGroupRequest>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        group = %request.group_name,
        "Adding computer to Entra group"
    );
    changed(
        directory
            .add_computer_to_group(&request.computer_name, &request.group_name)
            .await?,
    )
}

pub async fn remove_computer_from_group(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<EntraComputerGroupRequest>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        group = %request.group_name,
        "Removing computer from Entra group"
    );
    changed(
        directory
            .remove_computer_from_group(&request.computer_name, &request.group_name)
            .await?,
    )
}

pub async fn add_user_to_group(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<EntraUserGroupRequest>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        user = %request.sam_account_name,
        group = %request.group_name,
        "Adding user to Entra group"
    );
    changed(
        directory
            .add_user_to_group(&request.sam_account_name, &request.group_name)
            .await?,
    )
}

pub async fn remove_user_from_group(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<EntraUserGroupRequest>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        user = %request.sam_account_name,
        group = %request.group_name,
        "Removing user from Entra group"
    );
    changed(
        directory
            .remove_user_from_group(&request.sam_account_name, &request.group_name)
            .await?,
    )
}

pub async fn check_computer_in_group(
    Extension(directory): Extension<Arc<DirectoryService>>,
    Path((group_name, computer_name)): Path<(String, String)>,
) -> ApiResult<MembershipResponse> {
    let is_member = directory
        .is_computer_in_group(&computer_name, &group_name)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(MembershipResponse::new(is_member), MSG_SUCCESS),
    ))
}
