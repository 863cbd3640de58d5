//! cmgate Core Library
//!
//! Shared types for the cmgate management facade.
//!
//! # Modules
//!
//! - [`error`] - Error taxonomy shared by both planes and the HTTP edge (`CmgateError`)
//! - [`model`] - Domain values: hardware identifiers, affinity sources, migration status
//! - [`crypto`] - Passphrase-keyed secret encryption (`SecretCipher`)
//!
//! # Example
//!
//! ```
//! use cmgate_core::{CmgateError, HardwareId, Result};
//!
//! fn parse(raw: &str) -> Result<HardwareId> {
//!     HardwareId::mac(raw)
//! }
//!
//! let id = parse("00-15-5D-01-02-03").unwrap();
//! assert_eq!(id.value(), "00:15:5D:01:02:03");
//! assert!(matches!(parse(""), Err(CmgateError::InvalidArgument { .. })));
//! ```

pub mod crypto;
pub mod error;
pub mod model;

pub use crypto::{sha512_hash, CryptoError, SecretCipher};
pub use error::{CmgateError, Result};
pub use model::{
    bare_account_name, AffinitySource, Collection, DeviceRecord, HardwareId, IdKind,
    MembershipAction, MigrationAssociation, MigrationStatus, ResourceId, UserAffinity,
    AFFINITY_TYPE_ID,
};
