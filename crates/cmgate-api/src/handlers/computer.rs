//! Computer endpoints.
//!
//! - POST /computer/add-by-bios-guid
//! - POST /computer/add-by-mac
//! - GET /computer/:computerName
//! - DELETE /computer/:computerName
//! - DELETE /computer/by-guid/:guid
//! - GET /computer/:computerName/exists
//! - GET /computer/by-guid/:guid/exists
//! - GET /computer/by-resource-id/:resourceId/exists
//! - POST /computer/:computerName/clear-pxe-flag

use axum::{extract::Path, http::StatusCode, Extension};
use std::sync::Arc;

use super::{MSG_COMPUTER_ADDED, MSG_COMPUTER_DELETED, MSG_PXE_CLEARED, MSG_SUCCESS};
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    check_guid, AddComputerByBiosGuidRequest, AddComputerByMacRequest, ComputerDetailsResponse,
    ComputerExistsResponse, DeviceLookupResponse, ValidatedJson,
};
use crate::response::ApiResponse;
use crate::services::DeviceService;

pub async fn add_by_bios_guid(
    Extension(principal): Extension<Principal>,
    Extension(devices): Extension<Arc<DeviceService>>,
    ValidatedJson(request): ValidatedJson<AddComputerByBiosGuidRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        "Adding computer by BIOS GUID"
    );
    devices
        .add_by_bios_guid(&request.computer_name, &request.bios_guid)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::message(MSG_COMPUTER_ADDED)))
}

pub async fn add_by_mac(
    Extension(principal): Extension<Principal>,
    Extension(devices): Extension<Arc<DeviceService>>,
    ValidatedJson(request): ValidatedJson<AddComputerByMacRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        "Adding computer by MAC address"
    );
    devices
        .add_by_mac(&request.computer_name, &request.mac_address)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::message(MSG_COMPUTER_ADDED)))
}

pub async fn get_computer(
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<ComputerDetailsResponse> {
    let record = devices.details(&computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            ComputerDetailsResponse {
                computer_name: record.name,
                resource_id: record.resource_id.get(),
                sms_guid: record.sms_unique_identifier,
            },
            MSG_SUCCESS,
        ),
    ))
}

pub async fn delete_computer(
    Extension(principal): Extension<Principal>,
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<()> {
    tracing::info!(client = %principal.name, computer_name = %computer_name, "Deleting computer");
    devices.delete(&computer_name).await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_COMPUTER_DELETED)))
}

pub async fn delete_computer_by_guid(
    Extension(principal): Extension<Principal>,
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(guid): Path<String>,
) -> ApiResult<()> {
    check_guid(&guid)?;
    tracing::info!(client = %principal.name, bios_guid = %guid, "Deleting computer by GUID");
    devices.delete_by_bios_guid(&guid).await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_COMPUTER_DELETED)))
}

pub async fn computer_exists(
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<ComputerExistsResponse> {
    let exists = devices.exists(&computer_name).await?;
    let message = if exists { "Computer exists" } else { "Computer not found" };
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            ComputerExistsResponse {
                exists,
                computer_name,
            },
            message,
        ),
    ))
}

pub async fn computer_exists_by_guid(
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(guid): Path<String>,
) -> ApiResult<DeviceLookupResponse> {
    check_guid(&guid)?;
    let exists = devices.exists_by_bios_guid(&guid).await?;
    Ok(lookup(exists, guid))
}

pub async fn computer_exists_by_resource_id(
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(resource_id): Path<String>,
) -> ApiResult<DeviceLookupResponse> {
    let resource_id: i64 = resource_id.parse().map_err(|_| {
        ApiError::Validation(vec!["Resource id must be an integer".to_string()])
    })?;
    let exists = devices.exists_by_resource_id(resource_id).await?;
    Ok(lookup(exists, resource_id.to_string()))
}

fn lookup(exists: bool, identifier: String) -> (StatusCode, ApiResponse<DeviceLookupResponse>) {
    let message = if exists { "Computer exists" } else { "Computer not found" };
    (
        StatusCode::OK,
        ApiResponse::ok(DeviceLookupResponse { exists, identifier }, message),
    )
}

pub async fn clear_pxe_flag(
    Extension(principal): Extension<Principal>,
    Extension(devices): Extension<Arc<DeviceService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<()> {
    tracing::info!(client = %principal.name, computer_name = %computer_name, "Clearing PXE flag");
    devices.clear_pxe_flag(&computer_name).await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_PXE_CLEARED)))
}
