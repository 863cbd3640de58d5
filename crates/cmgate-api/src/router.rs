//! Router configuration.
//!
//! Every entity family gets its own router, nested under `/api/v1` by
//! [`api_router`]:
//!
//! - `/api/v1/computer` - device registration, lookup and deletion
//! - `/api/v1/collection` - collections and direct membership
//! - `/api/v1/user` - primary users (user-device affinity)
//! - `/api/v1/usmt` - state-migration associations
//! - `/api/v1/entra` - Entra ID group membership
//! - `/api/v1/intune` - Intune managed devices

use axum::{
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use cmgate_connector_configmgr::ManagementPlaneClient;
use cmgate_connector_graph::DirectoryPlaneClient;
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::auth::{AuthLayer, Authenticator};
use crate::handlers::{collection, computer, entra, intune, usmt, user};
use crate::middleware::{
    correlation_scope, propagate_correlation_id_layer, request_logging, set_correlation_id_layer,
    trace_layer,
};
use crate::services::{
    CollectionService, DeviceService, DirectoryService, MigrationService, UserService,
};

/// Services shared by all routers.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub device_service: Arc<DeviceService>,
    pub collection_service: Arc<CollectionService>,
    pub user_service: Arc<UserService>,
    pub migration_service: Arc<MigrationService>,
    pub directory_service: Arc<DirectoryService>,
    pub authenticator: Arc<Authenticator>,
}

impl ApiState {
    /// `directory` is `None` when Graph is not configured; the Entra and
    /// Intune endpoints then answer with a server error.
    pub fn new(
        plane: Arc<ManagementPlaneClient>,
        directory: Option<Arc<DirectoryPlaneClient>>,
        domain_short_name: Option<String>,
        authenticator: Authenticator,
    ) -> Self {
        let directory_service = match directory {
            Some(client) => DirectoryService::new(client),
            None => DirectoryService::disabled(),
        };
        Self {
            device_service: Arc::new(DeviceService::new(plane.clone())),
            collection_service: Arc::new(CollectionService::new(plane.clone())),
            user_service: Arc::new(UserService::new(plane.clone(), domain_short_name)),
            migration_service: Arc::new(MigrationService::new(plane)),
            directory_service: Arc::new(directory_service),
            authenticator: Arc::new(authenticator),
        }
    }
}

/// Computer router.
///
/// - `POST /add-by-bios-guid`
/// - `POST /add-by-mac`
/// - `GET /by-guid/:guid/exists`
/// - `DELETE /by-guid/:guid`
/// - `GET /by-resource-id/:resourceId/exists`
/// - `GET /:computerName`
/// - `DELETE /:computerName`
/// - `GET /:computerName/exists`
/// - `POST /:computerName/clear-pxe-flag`
pub fn computer_router(state: &ApiState) -> Router {
    Router::new()
        .route("/add-by-bios-guid", post(computer::add_by_bios_guid))
        .route("/add-by-mac", post(computer::add_by_mac))
        .route("/by-guid/:guid", delete(computer::delete_computer_by_guid))
        .route("/by-guid/:guid/exists", get(computer::computer_exists_by_guid))
        .route(
            "/by-resource-id/:resource_id/exists",
            get(computer::computer_exists_by_resource_id),
        )
        .route(
            "/:computer_name",
            get(computer::get_computer).delete(computer::delete_computer),
        )
        .route("/:computer_name/exists", get(computer::computer_exists))
        .route("/:computer_name/clear-pxe-flag", post(computer::clear_pxe_flag))
        .layer(Extension(state.device_service.clone()))
}

/// Collection router.
///
/// - `POST /` - create
/// - `GET /?name=` - look up by name
/// - `GET /:collectionId/members`
/// - `POST /:collectionId/members`
/// - `GET /:collectionId/members/:computerName`
/// - `DELETE /:collectionId/members/:computerName`
/// - `POST /:collectionId/refresh`
pub fn collection_router(state: &ApiState) -> Router {
    Router::new()
        .route(
            "/",
            get(collection::find_collection).post(collection::create_collection),
        )
        .route(
            "/:collection_id/members",
            get(collection::list_members).post(collection::add_member),
        )
        .route(
            "/:collection_id/members/:computer_name",
            get(collection::check_member).delete(collection::remove_member),
        )
        .route("/:collection_id/refresh", post(collection::refresh_collection))
        .layer(Extension(state.collection_service.clone()))
}

/// Primary user router.
///
/// - `POST /primary-user`
/// - `GET /:computerName/primary-users`
/// - `PUT /:computerName/primary-users`
/// - `DELETE /:computerName/primary-users/:userName`
pub fn user_router(state: &ApiState) -> Router {
    Router::new()
        .route("/primary-user", post(user::add_primary_user))
        .route(
            "/:computer_name/primary-users",
            get(user::get_primary_users).put(user::replace_primary_users),
        )
        .route(
            "/:computer_name/primary-users/:user_name",
            delete(user::remove_primary_user),
        )
        .layer(Extension(state.user_service.clone()))
}

/// State-migration router.
///
/// - `POST /association`
/// - `DELETE /association/:source/:destination`
/// - `GET /association/:source/:destination/status`
pub fn usmt_router(state: &ApiState) -> Router {
    Router::new()
        .route("/association", post(usmt::create_association))
        .route(
            "/association/:source/:destination",
            delete(usmt::remove_association),
        )
        .route(
            "/association/:source/:destination/status",
            get(usmt::association_status),
        )
        .layer(Extension(state.migration_service.clone()))
}

/// Entra ID router.
///
/// - `POST /group/add-computer`
/// - `POST /group/remove-computer`
/// - `POST /group/add-user`
/// - `POST /group/remove-user`
/// - `GET /group/:groupName/computers/:computerName`
pub fn entra_router(state: &ApiState) -> Router {
    Router::new()
        .route("/group/add-computer", post(entra::add_computer_to_group))
        .route("/group/remove-computer", post(entra::remove_computer_from_group))
        .route("/group/add-user", post(entra::add_user_to_group))
        .route("/group/remove-user", post(entra::remove_user_from_group))
        .route(
            "/group/:group_name/computers/:computer_name",
            get(entra::check_computer_in_group),
        )
        .layer(Extension(state.directory_service.clone()))
}

/// Intune router.
///
/// - `POST /device/primary-user`
/// - `POST /device/category`
/// - `GET /device/:computerName/exists`
/// - `GET /device/:computerName/co-managed`
/// - `GET /device/:computerName/primary-user`
pub fn intune_router(state: &ApiState) -> Router {
    Router::new()
        .route("/device/primary-user", post(intune::set_primary_user))
        .route("/device/category", post(intune::set_device_category))
        .route("/device/:computer_name/exists", get(intune::device_exists))
        .route("/device/:computer_name/co-managed", get(intune::co_managed))
        .route("/device/:computer_name/primary-user", get(intune::get_primary_user))
        .layer(Extension(state.directory_service.clone()))
}

/// All entity routers under `/api/v1`, behind the authentication gate.
pub fn api_router(state: ApiState) -> Router {
    let v1 = Router::new()
        .nest("/computer", computer_router(&state))
        .nest("/collection", collection_router(&state))
        .nest("/user", user_router(&state))
        .nest("/usmt", usmt_router(&state))
        .nest("/entra", entra_router(&state))
        .nest("/intune", intune_router(&state))
        .layer(AuthLayer::new(state.authenticator.clone()));

    Router::new().nest("/api/v1", v1)
}

/// Wraps `router` with correlation ids, the trace span and request logging.
///
/// Outermost first: the id is assigned before the span opens, so the span and
/// every log line inside it carry the same id.
pub fn with_http_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(set_correlation_id_layer())
            .layer(trace_layer())
            .layer(propagate_correlation_id_layer())
            .layer(middleware::from_fn(correlation_scope))
            .layer(middleware::from_fn(request_logging)),
    )
}
