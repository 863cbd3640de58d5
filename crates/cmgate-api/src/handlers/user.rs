//! Primary user (user-device affinity) endpoints.
//!
//! - GET /user/:computerName/primary-users
//! - POST /user/primary-user
//! - PUT /user/:computerName/primary-users
//! - DELETE /user/:computerName/primary-users/:userName

use axum::{extract::Path, http::StatusCode, Extension};
use std::sync::Arc;

use super::{MSG_SUCCESS, MSG_USER_ADDED, MSG_USER_REMOVED};
use crate::auth::Principal;
use crate::error::ApiResult;
use crate::models::{
    AddPrimaryUserRequest, ChangePrimaryUsersRequest, PrimaryUsersChangedResponse,
    PrimaryUsersResponse, ValidatedJson,
};
use crate::response::ApiResponse;
use crate::services::UserService;

pub async fn get_primary_users(
    Extension(users): Extension<Arc<UserService>>,
    Path(computer_name): Path<String>,
) -> ApiResult<PrimaryUsersResponse> {
    let primary_users = users.primary_users(&computer_name).await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            PrimaryUsersResponse {
                computer_name,
                primary_users,
            },
            MSG_SUCCESS,
        ),
    ))
}

pub async fn add_primary_user(
    Extension(principal): Extension<Principal>,
    Extension(users): Extension<Arc<UserService>>,
    ValidatedJson(request): ValidatedJson<AddPrimaryUserRequest>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %request.computer_name,
        user_name = %request.user_name,
        "Adding primary user"
    );
    users
        .add_primary_user(&request.computer_name, &request.user_name)
        .await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_USER_ADDED)))
}

pub async fn replace_primary_users(
    Extension(principal): Extension<Principal>,
    Extension(users): Extension<Arc<UserService>>,
    Path(computer_name): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangePrimaryUsersRequest>,
) -> ApiResult<PrimaryUsersChangedResponse> {
    tracing::info!(
        client = %principal.name,
        computer_name = %computer_name,
        users = request.user_list.len(),
        "Replacing primary users"
    );
    let changes = users
        .replace_primary_users(&computer_name, &request.user_list)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::ok(
            PrimaryUsersChangedResponse {
                added: changes.added,
                removed: changes.removed,
            },
            "Primary users updated successfully",
        ),
    ))
}

pub async fn remove_primary_user(
    Extension(principal): Extension<Principal>,
    Extension(users): Extension<Arc<UserService>>,
    Path((computer_name, user_name)): Path<(String, String)>,
) -> ApiResult<()> {
    tracing::info!(
        client = %principal.name,
        computer_name = %computer_name,
        user_name = %user_name,
        "Removing primary user"
    );
    users.remove_primary_user(&computer_name, &user_name).await?;
    Ok((StatusCode::OK, ApiResponse::message(MSG_USER_REMOVED)))
}
