use sha1::{Digest, Sha1};

use crate::types::{ServiceKey, SERVICE_KEY_LEN};

/// Computes SHA-1 and returns the 20-byte digest.
pub fn sha1_20(input: &[u8]) -> [u8; SERVICE_KEY_LEN] {
    Sha1::digest(input).into()
}

/// Computes BLAKE3 and truncates the digest to service-key width.
pub fn blake3_20(input: &[u8]) -> [u8; SERVICE_KEY_LEN] {
    let mut out = [0_u8; SERVICE_KEY_LEN];
    out.copy_from_slice(&blake3::hash(input).as_bytes()[..SERVICE_KEY_LEN]);
    out
}

/// Deterministic mapping from an identifier or name to a [`ServiceKey`].
///
/// Every device on the network must use the same derivation, otherwise
/// managers and subscribers disagree on which keys they are talking about.
pub trait KeyDerivation {
    fn derive_key(&self, input: &[u8]) -> ServiceKey;
}

/// SHA-1 derivation. The digest width matches the service-key width exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1KeyDerivation;

/// BLAKE3 derivation truncated to the service-key width.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3KeyDerivation;

impl KeyDerivation for Sha1KeyDerivation {
    fn derive_key(&self, input: &[u8]) -> ServiceKey {
        ServiceKey(sha1_20(input))
    }
}

impl KeyDerivation for Blake3KeyDerivation {
    fn derive_key(&self, input: &[u8]) -> ServiceKey {
        ServiceKey(blake3_20(input))
    }
}
