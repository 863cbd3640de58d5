//! HTTP handlers, one module per entity family.

pub mod collection;
pub mod computer;
pub mod entra;
pub mod intune;
pub mod usmt;
pub mod user;

pub(crate) const MSG_SUCCESS: &str = "Operation completed successfully";
pub(crate) const MSG_COMPUTER_ADDED: &str = "Computer added successfully";
pub(crate) const MSG_COMPUTER_DELETED: &str = "Computer deleted successfully";
pub(crate) const MSG_PXE_CLEARED: &str = "PXE flag cleared successfully";
pub(crate) const MSG_USER_ADDED: &str = "Primary user added successfully";
pub(crate) const MSG_USER_REMOVED: &str = "Primary user removed successfully";
pub(crate) const MSG_COLLECTION_UPDATED: &str = "Collection membership updated successfully";
pub(crate) const MSG_ASSOCIATION_CREATED: &str = "USMT association created successfully";
pub(crate) const MSG_ASSOCIATION_DELETED: &str = "USMT association deleted successfully";
