//! State-migration association endpoints.
//!
//! - POST /usmt/association
//! - DELETE /usmt/association/:source/:destination
//! - GET /usmt/association/:source/:destination/status

use axum::{extract::Path, http::StatusCode, Extension};
use std::sync::Arc;

use super::{MSG_ASSOCIATION_CREATED, MSG_ASSOCIATION_DELETED, MSG_SUCCESS};
use crate::auth::Principal;
use crate::error::ApiResult;
use crate::models::{UsmtAssociationRequest, UsmtMigrationStatusResponse, ValidatedJson};
use crate::response::ApiResponse;
use crate::services::MigrationService;

pub async fn create_association(
    Extension(principal): Extension<Principal>,
    Extension(migrations): Extension<Arc<MigrationService>>,
    ValidatedJson(request): ValidatedJson<UsmtAssociationRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        source = %request.source_computer_name,
        destination = %request.destination_computer_name,
        "Creating USMT association"
    );
    migrations
        .create(
            &request.source_computer_name,
            &request.destination_computer_name,
        )
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::message(MSG_ASSOCIATION_CREATED)))
}

pub async fn remove_association(
    Extension(principal): Extension<Principal>,
    Extension(migrations): Extension<Arc<MigrationService>>,
    Path((source, destination)): Path<(String, String)>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        source = %source,
        destination = %destination,
        "Removing USMT association"
    );
    migrations.remove(&source, &destination).await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_ASSOCIATION_DELETED)))
}

pub async fn association_status(
    Extension(migrations): Extension<Arc<MigrationService>>,
    Path((source, destination)): Path<(String, String)>,
) -> ApiResult<UsmtMigrationStatusResponse> {
    let status = migrations.status(&source, &destination).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            UsmtMigrationStatusResponse {
                source_computer_name: source,
                destination_computer_name: destination,
                status: status.as_str(),
            },
            MSG_SUCCESS,
        ),
    ))
}
