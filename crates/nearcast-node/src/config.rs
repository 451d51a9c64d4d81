use std::io;
use std::path::{Path, PathBuf};

use nearcast_core::{
    Blake3KeyDerivation, KeyDerivation, PeerId, ServiceKey, Sha1KeyDerivation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Client;
use crate::registry::{closest_by_distance, manager_selection};

/// Rule every device applies to pick a service manager among reachable devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElectionStrategy {
    /// Numerically largest identifier.
    #[default]
    HighestId,
    /// Device whose derived key has the smallest XOR distance to the service key.
    XorDistance,
}

impl ElectionStrategy {
    pub fn elect(self, service_key: &ServiceKey, candidates: &[Client]) -> Option<PeerId> {
        match self {
            Self::HighestId => manager_selection(candidates.iter().map(|c| &c.id)),
            Self::XorDistance => closest_by_distance(service_key, candidates),
        }
    }
}

/// Hash used to derive service keys from identifiers and names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDerivationKind {
    #[default]
    Sha1,
    Blake3,
}

impl KeyDerivation for KeyDerivationKind {
    fn derive_key(&self, input: &[u8]) -> ServiceKey {
        match self {
            Self::Sha1 => Sha1KeyDerivation.derive_key(input),
            Self::Blake3 => Blake3KeyDerivation.derive_key(input),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-device pub/sub settings, loadable from TOML.
///
/// All devices on one network must agree on `election` and `key_derivation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub election: ElectionStrategy,
    pub key_derivation: KeyDerivationKind,
    /// Keep manager records after their last subscriber leaves.
    pub retain_empty_managers: bool,
    /// Request reliable delivery for subscribe/unsubscribe.
    pub reliable_control: bool,
    /// Request reliable delivery for publish/info.
    pub reliable_data: bool,
    /// Cap on outbound publish payloads, in bytes.
    pub max_payload_len: Option<usize>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            election: ElectionStrategy::HighestId,
            key_derivation: KeyDerivationKind::Sha1,
            retain_empty_managers: false,
            reliable_control: false,
            reliable_data: false,
            max_payload_len: None,
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}
