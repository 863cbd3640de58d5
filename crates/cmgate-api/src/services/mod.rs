//! Domain services behind the REST handlers.
//!
//! Services resolve names to plane identifiers, apply the not-found contract
//! and log failures with context. Errors are returned unchanged; only the
//! HTTP edge maps them to statuses.

pub mod collection_service;
pub mod device_service;
pub mod directory_service;
pub mod migration_service;
pub mod user_service;

pub use collection_service::CollectionService;
pub use device_service::DeviceService;
pub use directory_service::DirectoryService;
pub use migration_service::MigrationService;
pub use user_service::UserService;
