//! Collection endpoints.
//!
//! - POST /collection
//! - GET /collection?name=
//! - GET /collection/:collectionId/members
//! - POST /collection/:collectionId/members
//! - GET /collection/:collectionId/members/:computerName
//! - DELETE /collection/:collectionId/members/:computerName
//! - POST /collection/:collectionId/refresh

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension,
};
use std::sync::Arc;
use validator::Validate;

use super::{MSG_COLLECTION_UPDATED, MSG_SUCCESS};
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    validation_messages, CollectionCreatedResponse, CollectionMemberRequest,
    CollectionMembersResponse, CollectionQuery, CollectionResponse, CreateCollectionRequest,
    MembershipChangeResponse, MembershipResponse, ValidatedJson,
};
use crate::response::ApiResponse;
use crate::services::CollectionService;

pub async fn create_collection(
    Extension(principal): Extension<Principal>,
    Extension(collections): Extension<Arc<CollectionService>>,
    ValidatedJson(request): ValidatedJson<CreateCollectionRequest>,
) -> ApiResult<CollectionCreatedResponse> {
    tracing::info!(
        client = %principal.name,
        collection_name = %request.collection_name,
        "Creating collection"
    );
    let collection_id = collections
        .create(
            &request.collection_name,
            &request.description,
            &request.limiting_collection_name,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            CollectionCreatedResponse { collection_id },
            "Collection created successfully",
        ),
    ))
}

pub async fn find_collection(
    Extension(collections): Extension<Arc<CollectionService>>,
    Query(query): Query<CollectionQuery>,
) -> ApiResult<CollectionResponse> {
    query
        .validate()
        .map_err(|e| ApiError::Validation(validation_messages(&e)))?;
    let collection = collections.find_by_name(&query.name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            CollectionResponse {
                collection_id: collection.id,
                collection_name: collection.name,
            },
            MSG_SUCCESS,
        ),
    ))
}

pub async fn list_members(
    Extension(collections): Extension<Arc<CollectionService>>,
    Path(collection_id): Path<String>,
) -> ApiResult<CollectionMembersResponse> {
    let members = collections.members(&collection_id).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            CollectionMembersResponse {
                collection_id,
                members,
            },
            MSG_SUCCESS,
        ),
    ))
}

pub async fn add_member(
    Extension(principal): Extension<Principal>,
    Extension(collections): Extension<Arc<CollectionService>>,
    Path(collection_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CollectionMemberRequest>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        collection_id = %collection_id,
        computer_name = %request.computer_name,
        "Adding collection member"
    );
    let changed = collections
        .add_member(&collection_id, &request.computer_name)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(MembershipChangeResponse { changed }, MSG_COLLECTION_UPDATED),
    ))
}

pub async fn remove_member(
    Extension(principal): Extension<Principal>,
    Extension(collections): Extension<Arc<CollectionService>>,
    Path((collection_id, computer_name)): Path<(String, String)>,
) -> ApiResult<MembershipChangeResponse> {
    tracing::info!(
        client = %principal.name,
        collection_id = %collection_id,
        computer_name = %computer_name,
        "Removing collection member"
    );
    let changed = collections
        .remove_member(&collection_id, &computer_name)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(MembershipChangeResponse { changed }, MSG_COLLECTION_UPDATED),
    ))
}

pub async fn check_member(
    Extension(collections): Extension<Arc<CollectionService>>,
    Path((collection_id, computer_name)): Path<(String, String)>,
) -> ApiResult<MembershipResponse> {
    let is_member = collections.is_member(&collection_id, &computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(MembershipResponse::new(is_member), MSG_SUCCESS),
    ))
}

/// Answers 202: the site only queues the re-evaluation.
pub async fn refresh_collection(
    Extension(principal): Extension<Principal>,
    Extension(collections): Extension<Arc<CollectionService>>,
    Path(collection_id): Path<String>,
) -> ApiResult<()> {
    tracing::info!(client = %principal.name, collection_id = %collection_id, "Refreshing collection");
    collections.refresh(&collection_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::message("Collection membership refresh requested"),
    ))
}
