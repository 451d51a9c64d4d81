use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hash::KeyDerivation;

/// Width of a transport-level device identifier.
pub const PEER_ID_LEN: usize = 12;
/// Width of a service key (digest length of the key-derivation hash).
pub const SERVICE_KEY_LEN: usize = 20;

/// 12-byte opaque identifier of a reachable device.
///
/// Ordering is big-endian numeric over the fixed-width array, which is the
/// same relation `bytes::compare` reports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub [u8; PEER_ID_LEN]);

/// 20-byte opaque identifier of a pub/sub topic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey(pub [u8; SERVICE_KEY_LEN]);

impl PeerId {
    pub fn as_bytes(&self) -> &[u8; PEER_ID_LEN] {
        &self.0
    }
}

impl ServiceKey {
    pub fn as_bytes(&self) -> &[u8; SERVICE_KEY_LEN] {
        &self.0
    }

    /// Derives the key for a human-readable service name.
    ///
    /// See [`crate::names::normalize_service_name`] for the normalization applied.
    pub fn from_name(derivation: &dyn KeyDerivation, name: &str) -> Self {
        crate::names::service_key_for_name(derivation, name)
    }
}

impl TryFrom<&[u8]> for PeerId {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; PEER_ID_LEN] = bytes.try_into().map_err(|_| CoreError::InvalidWidth {
            expected: PEER_ID_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl TryFrom<&[u8]> for ServiceKey {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; SERVICE_KEY_LEN] =
            bytes.try_into().map_err(|_| CoreError::InvalidWidth {
                expected: SERVICE_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(self.0))
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{PeerId, ServiceKey, PEER_ID_LEN, SERVICE_KEY_LEN};
    use crate::error::CoreError;
    use crate::hash::Sha1KeyDerivation;

    #[test]
    fn try_from_slice_checks_width() {
        let id = PeerId::try_from(&[7_u8; PEER_ID_LEN][..]).expect("12 bytes should convert");
        assert_eq!(id, PeerId([7; PEER_ID_LEN]));

        let err = ServiceKey::try_from(&[1_u8; 3][..]).expect_err("3 bytes is too short");
        assert_eq!(
            err,
            CoreError::InvalidWidth {
                expected: SERVICE_KEY_LEN,
                actual: 3
            }
        );
    }

    #[test]
    fn display_renders_lowercase_hex() {
        let mut raw = [0_u8; PEER_ID_LEN];
        raw[0] = 0xAB;
        raw[11] = 0x01;
        assert_eq!(PeerId(raw).to_string(), "ab0000000000000000000001");
    }

    #[test]
    fn from_name_normalizes_before_hashing() {
        let a = ServiceKey::from_name(&Sha1KeyDerivation, "  Weather");
        let b = ServiceKey::from_name(&Sha1KeyDerivation, "weather");
        assert_eq!(a, b);
    }

    #[test]
    fn ordering_is_big_endian() {
        let mut low = [0_u8; PEER_ID_LEN];
        let mut high = [0_u8; PEER_ID_LEN];
        low[11] = 0xFF;
        high[0] = 0x01;
        assert!(PeerId(high) > PeerId(low));
    }
}
