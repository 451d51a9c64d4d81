//! Core nearcast primitives shared across crates.
//!
//! Includes fixed-size identifier types, byte-array comparison helpers,
//! key derivation, service naming, and base errors.

pub mod bytes;
pub mod error;
pub mod hash;
pub mod names;
pub mod types;

pub use bytes::KeyOrdering;
pub use error::CoreError;
pub use hash::{Blake3KeyDerivation, KeyDerivation, Sha1KeyDerivation};
pub use types::{PeerId, ServiceKey, PEER_ID_LEN, SERVICE_KEY_LEN};
