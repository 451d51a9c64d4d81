use nearcast_core::{PeerId, ServiceKey};

use crate::keyed_list::{Keyed, KeyedList};

/// One service this device is subscribed to, and where it subscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub service_key: ServiceKey,
    /// Device elected as manager when the subscription was last (re)sent.
    pub manager: PeerId,
    /// Human-readable name, when subscribed by name.
    pub service_name: Option<String>,
}

impl Keyed for Subscription {
    type Key = ServiceKey;

    fn key(&self) -> &ServiceKey {
        &self.service_key
    }
}

pub type SubscriptionList = KeyedList<Subscription>;

/// Records a subscription. Returns false when `service_key` is already subscribed.
pub fn subscribe_key(
    subscriptions: &mut SubscriptionList,
    service_key: ServiceKey,
    manager: PeerId,
) -> bool {
    subscriptions.insert_if_absent(Subscription {
        service_key,
        manager,
        service_name: None,
    })
}

/// Points an existing subscription at a new manager.
///
/// Returns the previous manager when it changed.
pub fn reassign_manager(
    subscriptions: &mut SubscriptionList,
    service_key: &ServiceKey,
    manager: PeerId,
) -> Option<PeerId> {
    let subscription = subscriptions.find_mut(service_key)?;
    if subscription.manager == manager {
        return None;
    }
    Some(std::mem::replace(&mut subscription.manager, manager))
}
