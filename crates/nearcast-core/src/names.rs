use crate::hash::KeyDerivation;
use crate::types::ServiceKey;

/// Normalizes app-level service names for deterministic key derivation.
///
/// Empty/whitespace-only names map to `"general"`.
pub fn normalize_service_name(name: &str) -> String {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        "general".to_string()
    } else {
        normalized
    }
}

/// Derives the service key for a human-readable service name.
pub fn service_key_for_name(derivation: &dyn KeyDerivation, name: &str) -> ServiceKey {
    derivation.derive_key(normalize_service_name(name).as_bytes())
}
