//! nearcast node layer.
//!
//! Wires the packet codec to service-manager bookkeeping: receive-side
//! dispatch, deterministic manager election, own subscriptions, and the
//! `PubSubNode` facade driven by a pluggable transport.

pub mod client;
pub mod config;
pub mod keyed_list;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod subscriptions;

pub use client::{Client, ClientList};
pub use config::{ConfigError, ElectionStrategy, KeyDerivationKind, NodeConfig};
pub use keyed_list::{Keyed, KeyedList};
pub use node::{NodeError, NodeStats, PubSubNode, ReceivedMessage};
pub use protocol::{Protocol, ProtocolError, ProtocolHandler, ReceiveEvent};
pub use registry::{
    closest_by_distance, lock_registry, manager_selection, RegistryError, ServiceManager,
    ServiceManagerRegistry, SharedRegistry, SubscribeOutcome, UnsubscribeOutcome,
};
pub use subscriptions::{Subscription, SubscriptionList};
