use std::sync::{Arc, Mutex, MutexGuard};

use nearcast_core::bytes::{compare_arrays, xor_arrays};
use nearcast_core::{KeyOrdering, PeerId, ServiceKey, SERVICE_KEY_LEN};
use thiserror::Error;

use crate::client::Client;
use crate::keyed_list::{Keyed, KeyedList};

/// Result of adding a subscriber to a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Result of removing a subscriber from a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed,
    WasNotSubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("not managing service {0}")]
    NotManaged(ServiceKey),
}

/// Subscriber set for one service this device manages.
#[derive(Debug, Clone)]
pub struct ServiceManager {
    service_key: ServiceKey,
    subscribers: KeyedList<PeerId>,
}

impl ServiceManager {
    pub fn new(service_key: ServiceKey) -> Self {
        Self {
            service_key,
            subscribers: KeyedList::new(),
        }
    }

    pub fn service_key(&self) -> &ServiceKey {
        &self.service_key
    }

    pub fn subscribers(&self) -> &KeyedList<PeerId> {
        &self.subscribers
    }
}

impl Keyed for ServiceManager {
    type Key = ServiceKey;

    fn key(&self) -> &ServiceKey {
        &self.service_key
    }
}

/// Every service this device currently manages, at most one record per key.
#[derive(Debug, Clone, Default)]
pub struct ServiceManagerRegistry {
    managers: KeyedList<ServiceManager>,
}

/// Registry shared between the receive path and the local node facade.
pub type SharedRegistry = Arc<Mutex<ServiceManagerRegistry>>;

/// Locks a shared registry, recovering the guard if a holder panicked.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, ServiceManagerRegistry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

impl ServiceManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Creates an empty manager record for `key` unless one exists.
    /// Returns true when created.
    pub fn become_manager_if_absent(&mut self, key: ServiceKey) -> bool {
        self.managers.insert_if_absent(ServiceManager::new(key))
    }

    pub fn add_subscriber(
        &mut self,
        key: &ServiceKey,
        id: PeerId,
    ) -> Result<SubscribeOutcome, RegistryError> {
        let manager = self
            .managers
            .find_mut(key)
            .ok_or(RegistryError::NotManaged(*key))?;
        if manager.subscribers.insert_if_absent(id) {
            Ok(SubscribeOutcome::Added)
        } else {
            Ok(SubscribeOutcome::AlreadySubscribed)
        }
    }

    /// Becomes manager for `key` if needed, then adds `id` as a subscriber.
    ///
    /// Returns whether a record was created alongside the add outcome.
    pub fn accept_subscriber(
        &mut self,
        key: ServiceKey,
        id: PeerId,
    ) -> Result<(bool, SubscribeOutcome), RegistryError> {
        let created = self.become_manager_if_absent(key);
        let outcome = self.add_subscriber(&key, id)?;
        Ok((created, outcome))
    }

    pub fn remove_subscriber(
        &mut self,
        key: &ServiceKey,
        id: &PeerId,
    ) -> Result<UnsubscribeOutcome, RegistryError> {
        let manager = self
            .managers
            .find_mut(key)
            .ok_or(RegistryError::NotManaged(*key))?;
        if manager.subscribers.remove(id) {
            Ok(UnsubscribeOutcome::Removed)
        } else {
            Ok(UnsubscribeOutcome::WasNotSubscribed)
        }
    }

    pub fn is_managing(&self, key: &ServiceKey) -> bool {
        self.managers.contains(key)
    }

    pub fn manager(&self, key: &ServiceKey) -> Option<&ServiceManager> {
        self.managers.find(key)
    }

    /// Removes `id` from every subscriber set. Returns the keys it was
    /// removed from.
    pub fn remove_subscriber_everywhere(&mut self, id: &PeerId) -> Vec<ServiceKey> {
        let mut pruned = Vec::new();
        for key in self.managed_keys() {
            if let Some(manager) = self.managers.find_mut(&key) {
                if manager.subscribers.remove(id) {
                    pruned.push(key);
                }
            }
        }
        pruned
    }

    /// Subscribers of `key` in subscription order; `None` when unmanaged.
    pub fn subscribers(&self, key: &ServiceKey) -> Option<Vec<PeerId>> {
        self.managers
            .find(key)
            .map(|m| m.subscribers.iter().copied().collect())
    }

    pub fn managed_keys(&self) -> Vec<ServiceKey> {
        self.managers.iter().map(|m| m.service_key).collect()
    }

    /// Drops the record for `key` together with its subscriber set.
    pub fn remove_manager(&mut self, key: &ServiceKey) -> bool {
        self.managers.remove(key)
    }

    /// Drops every record with no subscribers. Returns how many were dropped.
    pub fn evict_empty(&mut self) -> usize {
        let before = self.managers.len();
        self.managers.retain(|m| !m.subscribers.is_empty());
        before - self.managers.len()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

/// Elects the numerically largest identifier (big-endian) among `candidates`.
///
/// The result does not depend on iteration order. `None` for no candidates.
pub fn manager_selection<'a, I>(candidates: I) -> Option<PeerId>
where
    I: IntoIterator<Item = &'a PeerId>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if compare_arrays(&current.0, &candidate.0) != KeyOrdering::BGreater => {
            Some(current)
        }
        _ => Some(*candidate),
    })
}

/// Elects the candidate whose derived key is closest to `service_key` by XOR
/// distance. Equal distances fall back to the larger identifier.
pub fn closest_by_distance<'a, I>(service_key: &ServiceKey, candidates: I) -> Option<PeerId>
where
    I: IntoIterator<Item = &'a Client>,
{
    let mut best: Option<(&Client, [u8; SERVICE_KEY_LEN])> = None;
    for candidate in candidates {
        let distance = xor_arrays(&candidate.key.0, &service_key.0);
        let replace = match &best {
            None => true,
            Some((current, current_distance)) => {
                match compare_arrays(&distance, current_distance) {
                    KeyOrdering::BGreater => true,
                    KeyOrdering::Equal => {
                        compare_arrays(&candidate.id.0, &current.id.0) == KeyOrdering::AGreater
                    }
                    KeyOrdering::AGreater => false,
                }
            }
        };
        if replace {
            best = Some((candidate, distance));
        }
    }
    best.map(|(client, _)| client.id)
}

#[cfg(test)]
mod tests {
    use nearcast_core::{PeerId, ServiceKey, Sha1KeyDerivation};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::{
        closest_by_distance, lock_registry, manager_selection, RegistryError,
        ServiceManagerRegistry, SubscribeOutcome, UnsubscribeOutcome,
    };
    use crate::client::Client;

    fn id_with_lead(lead: u8) -> PeerId {
        let mut raw = [0_u8; 12];
        raw[0] = lead;
        raw[11] = 0x01;
        PeerId(raw)
    }

    #[test]
    fn become_manager_is_idempotent() {
        let mut registry = ServiceManagerRegistry::new();
        let key = ServiceKey([0x42; 20]);
        assert!(registry.become_manager_if_absent(key));
        registry
            .add_subscriber(&key, id_with_lead(1))
            .expect("key is managed");
        assert!(!registry.become_manager_if_absent(key));
        assert_eq!(registry.subscribers(&key), Some(vec![id_with_lead(1)]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn add_subscriber_twice_reports_already_subscribed() {
        let mut registry = ServiceManagerRegistry::new();
        let key = ServiceKey([0x42; 20]);
        registry.become_manager_if_absent(key);
        let id = id_with_lead(7);

        assert_eq!(registry.add_subscriber(&key, id), Ok(SubscribeOutcome::Added));
        assert_eq!(
            registry.add_subscriber(&key, id),
            Ok(SubscribeOutcome::AlreadySubscribed)
        );
        assert_eq!(registry.subscribers(&key).map(|s| s.len()), Some(1));
    }

    #[test]
    fn accept_subscriber_creates_record_once() {
        let mut registry = ServiceManagerRegistry::new();
        let key = ServiceKey([0x42; 20]);
        assert_eq!(
            registry.accept_subscriber(key, id_with_lead(1)),
            Ok((true, SubscribeOutcome::Added))
        );
        assert_eq!(
            registry.accept_subscriber(key, id_with_lead(2)),
            Ok((false, SubscribeOutcome::Added))
        );
        assert_eq!(
            registry.accept_subscriber(key, id_with_lead(1)),
            Ok((false, SubscribeOutcome::AlreadySubscribed))
        );
        assert!(registry.is_managing(&key));
    }

    #[test]
    fn remove_unknown_subscriber_is_not_an_error() {
        let mut registry = ServiceManagerRegistry::new();
        let key = ServiceKey([0x42; 20]);
        registry.become_manager_if_absent(key);
        assert_eq!(
            registry.remove_subscriber(&key, &id_with_lead(3)),
            Ok(UnsubscribeOutcome::WasNotSubscribed)
        );
        registry
            .add_subscriber(&key, id_with_lead(3))
            .expect("key is managed");
        assert_eq!(
            registry.remove_subscriber(&key, &id_with_lead(3)),
            Ok(UnsubscribeOutcome::Removed)
        );
    }

    #[test]
    fn unmanaged_key_is_reported() {
        let mut registry = ServiceManagerRegistry::new();
        let key = ServiceKey([0x11; 20]);
        assert_eq!(
            registry.add_subscriber(&key, id_with_lead(1)),
            Err(RegistryError::NotManaged(key))
        );
        assert_eq!(
            registry.remove_subscriber(&key, &id_with_lead(1)),
            Err(RegistryError::NotManaged(key))
        );
        assert!(registry.subscribers(&key).is_none());
    }

    #[test]
    fn evict_empty_and_remove_manager() {
        let mut registry = ServiceManagerRegistry::new();
        let busy = ServiceKey([1; 20]);
        let idle = ServiceKey([2; 20]);
        registry.become_manager_if_absent(busy);
        registry.become_manager_if_absent(idle);
        registry
            .add_subscriber(&busy, id_with_lead(1))
            .expect("key is managed");

        assert_eq!(registry.evict_empty(), 1);
        assert_eq!(registry.managed_keys(), vec![busy]);
        assert!(registry.remove_manager(&busy));
        assert!(!registry.remove_manager(&busy));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_subscriber_everywhere_prunes_every_record() {
        let mut registry = ServiceManagerRegistry::new();
        let weather = ServiceKey([0x01; 20]);
        let traffic = ServiceKey([0x02; 20]);
        let news = ServiceKey([0x03; 20]);
        let gone = PeerId([0xAA; 12]);
        let stays = PeerId([0xBB; 12]);
        registry.accept_subscriber(weather, gone).expect("weather");
        registry.accept_subscriber(traffic, gone).expect("traffic");
        registry.accept_subscriber(traffic, stays).expect("traffic");
        registry.accept_subscriber(news, stays).expect("news");

        let mut pruned = registry.remove_subscriber_everywhere(&gone);
        pruned.sort();
        assert_eq!(pruned, vec![weather, traffic]);
        assert_eq!(registry.subscribers(&weather), Some(Vec::new()));
        assert_eq!(registry.subscribers(&traffic), Some(vec![stays]));
        assert_eq!(registry.subscribers(&news), Some(vec![stays]));
        assert!(registry.remove_subscriber_everywhere(&gone).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn shared_registry_survives_poisoned_lock() {
        let shared = ServiceManagerRegistry::new().into_shared();
        let cloned = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().expect("first lock succeeds");
            panic!("poison the registry lock");
        })
        .join();
        assert!(shared.is_poisoned());
        let mut guard = lock_registry(&shared);
        assert!(guard.become_manager_if_absent(ServiceKey([9; 20])));
    }

    #[test]
    fn manager_selection_picks_largest_regardless_of_order() {
        let candidates = vec![id_with_lead(0x10), id_with_lead(0x20), id_with_lead(0x05)];
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..32 {
            let mut shuffled = candidates.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(manager_selection(&shuffled), Some(id_with_lead(0x20)));
        }
        let none: [PeerId; 0] = [];
        assert_eq!(manager_selection(&none), None);
        assert_eq!(
            manager_selection(&[id_with_lead(0x05)]),
            Some(id_with_lead(0x05))
        );
    }

    #[test]
    fn closest_by_distance_is_order_independent() {
        let clients: Vec<Client> = (1_u8..=8)
            .map(|n| Client::new(id_with_lead(n), &Sha1KeyDerivation))
            .collect();
        let service = ServiceKey([0x5A; 20]);
        let expected = closest_by_distance(&service, &clients).expect("candidates present");

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..16 {
            let mut shuffled = clients.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(closest_by_distance(&service, &shuffled), Some(expected));
        }
    }

    #[test]
    fn closest_by_distance_prefers_exact_key_match() {
        let target = Client::new(id_with_lead(0x33), &Sha1KeyDerivation);
        let other = Client::new(id_with_lead(0x44), &Sha1KeyDerivation);
        assert_eq!(
            closest_by_distance(&target.key, &[other, target]),
            Some(target.id)
        );
        let none: [Client; 0] = [];
        assert_eq!(closest_by_distance(&target.key, &none), None);
    }
}
