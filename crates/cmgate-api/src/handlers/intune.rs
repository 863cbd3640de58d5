//! Intune managed-device endpoints.
//!
//! - GET /intune/device/:computerName/exists
//! - GET /intune/device/:computerName/co-managed
//! - GET /intune/device/:computerName/primary-user
//! - POST /intune/device/primary-user
//! - POST /intune/device/category

use axum::{extract::Path, http::StatusCode, Extension};
use std::sync::Arc;

use super::MSG_SUCCESS;
use crate::auth::Principal;
use crate::error::ApiResult;
use crate::models::{
    CoManagedStatusResponse, DeviceCategoryRequest, IntuneDeviceExistsResponse,
    IntunePrimaryUserRequest, IntunePrimaryUserResponse, ValidatedJson,
};
use crate::response::ApiResponse;
use crate::services::DirectoryService;

pub async fn device_exists(
    Extension(directory): Extension<Arc<DirectoryService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<IntuneDeviceExistsResponse> {
    let exists = directory.intune_device_exists(&computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(IntuneDeviceExistsResponse::new(exists), MSG_SUCCESS),
    ))
}

pub async fn co_managed(
    Extension(directory): Extension<Arc<DirectoryService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<CoManagedStatusResponse> {
    let is_co_managed = directory.is_co_managed(&computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(CoManagedStatusResponse::new(is_co_managed), MSG_SUCCESS),
    ))
}

pub async fn get_primary_user(
    Extension(directory): Extension<Arc<DirectoryService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<IntunePrimaryUserResponse> {
    let user_principal_name = directory.primary_user(&computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            IntunePrimaryUserResponse {
                computer_name,
                user_principal_name,
            },
            MSG_SUCCESS,
        ),
    ))
}

pub async fn set_primary_user(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<IntunePrimaryUserRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        user_name = %request.user_name,
        "Setting Intune primary user"
    );
    directory
        .set_primary_user(&request.computer_name, &request.user_name)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::message("Primary user set successfully"),
    ))
}

pub async fn set_device_category(
    Extension(principal): Extension<Principal>,
    Extension(directory): Extension<Arc<DirectoryService>>,
    ValidatedJson(request): ValidatedJson<DeviceCategoryRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        category = %request.device_category_name,
        "Setting Intune device category"
    );
    directory
        .set_device_category(&request.computer_name, &request.device_category_name)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::message("Device category set successfully"),
    ))
}
