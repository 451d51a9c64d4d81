use nearcast_core::{KeyDerivation, PeerId, ServiceKey};

use crate::keyed_list::{Keyed, KeyedList};

/// A reachable device: its transport identifier plus the key derived from it.
///
/// Equality is by identifier only; the derived key is a cache.
#[derive(Debug, Clone, Copy)]
pub struct Client {
    pub id: PeerId,
    pub key: ServiceKey,
}

impl Client {
    pub fn new(id: PeerId, derivation: &dyn KeyDerivation) -> Self {
        Self {
            id,
            key: derivation.derive_key(id.as_bytes()),
        }
    }

    pub fn is_id_equal(&self, id: &PeerId) -> bool {
        self.id == *id
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Client {}

impl Keyed for Client {
    type Key = PeerId;

    fn key(&self) -> &PeerId {
        &self.id
    }
}

/// Devices currently known to be reachable.
pub type ClientList = KeyedList<Client>;

#[cfg(test)]
mod tests {
    use super::{Client, ClientList};
    use nearcast_core::{PeerId, ServiceKey, Sha1KeyDerivation};

    #[test]
    fn client_key_is_derived_from_identifier() {
        let id = PeerId([
            0xe7, 0x79, 0x34, 0x6c, 0x66, 0x9c, 0x17, 0xf4, 0x34, 0xc8, 0xce, 0x0e,
        ]);
        let client = Client::new(id, &Sha1KeyDerivation);
        assert_eq!(
            client.key.to_string(),
            "e49aa7792cf4fd096c103f4ba463e27b91609e6b"
        );
        assert!(client.is_id_equal(&id));
        assert!(!client.is_id_equal(&PeerId([0; 12])));
    }

    #[test]
    fn equality_ignores_derived_key() {
        let id = PeerId([1; 12]);
        let a = Client {
            id,
            key: ServiceKey([0; 20]),
        };
        let b = Client {
            id,
            key: ServiceKey([0xFF; 20]),
        };
        assert_eq!(a, b);

        let mut clients = ClientList::new();
        assert!(clients.insert_if_absent(a));
        assert!(!clients.insert_if_absent(b));
        assert_eq!(clients.len(), 1);
    }
}
