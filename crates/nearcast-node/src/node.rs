use std::fmt::Display;

use nearcast_codec::{
    encode_info, encode_publish, encode_subscribe, encode_unsubscribe, HEADER_LEN,
};
use nearcast_core::{PeerId, ServiceKey};
use nearcast_transport::TransportAdapter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{Client, ClientList};
use crate::config::NodeConfig;
use crate::protocol::{Protocol, ProtocolError, ProtocolHandler, ReceiveEvent};
use crate::registry::{
    lock_registry, RegistryError, ServiceManagerRegistry, SharedRegistry, SubscribeOutcome,
    UnsubscribeOutcome,
};
use crate::subscriptions::{reassign_manager, subscribe_key, SubscriptionList};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("payload must not be empty")]
    EmptyPayload,
    #[error("payload of {len} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
    /// Packets handed to the node by the transport.
    pub inbound_messages: usize,
    /// Inbound packets rejected by validation or the registry.
    pub rejected_messages: usize,
    /// Subscribe requests accepted as manager.
    pub subscribe_requests: usize,
    /// Unsubscribe requests accepted as manager.
    pub unsubscribe_requests: usize,
    /// Publish requests handled as manager, local ones included.
    pub publish_requests: usize,
    /// Publish requests for services this device does not manage.
    pub unmanaged_publishes: usize,
    /// Info messages pushed to the local inbox.
    pub delivered_messages: usize,
    /// Info messages for services this device is not subscribed to.
    pub unsolicited_infos: usize,
    /// Packets accepted by the transport.
    pub outbound_messages: usize,
    /// Packets the transport refused.
    pub send_failures: usize,
    /// Subscriptions moved to a newly elected manager.
    pub resubscriptions: usize,
    /// Manager records dropped (emptied or no longer elected).
    pub released_managers: usize,
}

/// An info message delivered to the local application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub service_key: ServiceKey,
    pub payload: Vec<u8>,
}

impl ReceivedMessage {
    /// Payload as UTF-8 with one trailing NUL stripped, for textual services.
    pub fn text(&self) -> Option<&str> {
        let bytes = self.payload.strip_suffix(&[0]).unwrap_or(&self.payload[..]);
        std::str::from_utf8(bytes).ok()
    }
}

/// One device on the overlay: subscriber, publisher, and manager for the
/// services it is elected for.
pub struct PubSubNode<T: TransportAdapter> {
    local: Client,
    transport: T,
    clients: ClientList,
    subscriptions: SubscriptionList,
    protocol: Protocol,
    config: NodeConfig,
    stats: NodeStats,
    inbox: Vec<ReceivedMessage>,
}

/// Disjoint borrows of node state handed to [`Protocol::receive`].
struct NodeContext<'a, T: TransportAdapter> {
    local_id: PeerId,
    registry: &'a SharedRegistry,
    transport: &'a mut T,
    subscriptions: &'a SubscriptionList,
    config: &'a NodeConfig,
    stats: &'a mut NodeStats,
    inbox: &'a mut Vec<ReceivedMessage>,
}

impl<T> NodeContext<'_, T>
where
    T: TransportAdapter,
    T::Error: Display,
{
    fn send(&mut self, peer: &PeerId, packet: &[u8], reliable: bool) -> Result<(), NodeError> {
        match self.transport.send(peer, packet, reliable) {
            Ok(()) => {
                self.stats.outbound_messages += 1;
                Ok(())
            }
            Err(err) => {
                self.stats.send_failures += 1;
                Err(NodeError::Transport(err.to_string()))
            }
        }
    }

    fn deliver_local(&mut self, service_key: &ServiceKey, payload: &[u8]) {
        if !self.subscriptions.contains(service_key) {
            self.stats.unsolicited_infos += 1;
            warn!(service = %service_key, "dropping info for unsubscribed service");
            return;
        }
        self.inbox.push(ReceivedMessage {
            service_key: *service_key,
            payload: payload.to_vec(),
        });
        self.stats.delivered_messages += 1;
    }

    /// Sends INFO to every subscriber of a managed service. Send failures are
    /// counted and logged; the remaining subscribers are still served.
    fn fan_out(&mut self, service_key: &ServiceKey, payload: &[u8]) {
        let subscribers = lock_registry(self.registry).subscribers(service_key);
        let Some(subscribers) = subscribers else {
            self.stats.unmanaged_publishes += 1;
            warn!(service = %service_key, "dropping publish for unmanaged service");
            return;
        };
        let packet = encode_info(service_key, payload);
        let reliable = self.config.reliable_data;
        for subscriber in subscribers {
            if subscriber == self.local_id {
                self.deliver_local(service_key, payload);
                continue;
            }
            if let Err(err) = self.send(&subscriber, &packet, reliable) {
                warn!(service = %service_key, peer = %subscriber, %err, "info send failed");
            }
        }
    }

    fn release_if_empty(&mut self, service_key: &ServiceKey) {
        if self.config.retain_empty_managers {
            return;
        }
        let mut registry = lock_registry(self.registry);
        let empty = registry
            .manager(service_key)
            .is_some_and(|m| m.subscribers().is_empty());
        if empty && registry.remove_manager(service_key) {
            self.stats.released_managers += 1;
            info!(service = %service_key, "released empty service manager");
        }
    }
}

impl<T> ProtocolHandler for NodeContext<'_, T>
where
    T: TransportAdapter,
    T::Error: Display,
{
    fn on_subscribe_request(
        &mut self,
        service_key: &ServiceKey,
        origin: &PeerId,
        outcome: SubscribeOutcome,
    ) {
        self.stats.subscribe_requests += 1;
        if outcome == SubscribeOutcome::Added {
            info!(service = %service_key, subscriber = %origin, "subscriber added");
        }
    }

    fn on_unsubscribe_request(
        &mut self,
        service_key: &ServiceKey,
        origin: &PeerId,
        outcome: UnsubscribeOutcome,
    ) {
        self.stats.unsubscribe_requests += 1;
        if outcome == UnsubscribeOutcome::Removed {
            info!(service = %service_key, subscriber = %origin, "subscriber removed");
            self.release_if_empty(service_key);
        }
    }

    fn on_publish(&mut self, service_key: &ServiceKey, payload: &[u8]) {
        self.stats.publish_requests += 1;
        self.fan_out(service_key, payload);
    }

    fn on_info(&mut self, service_key: &ServiceKey, payload: &[u8]) {
        self.deliver_local(service_key, payload);
    }
}

fn elect_manager(
    local: &Client,
    clients: &ClientList,
    config: &NodeConfig,
    service_key: &ServiceKey,
) -> PeerId {
    let mut candidates = Vec::with_capacity(clients.len() + 1);
    candidates.push(*local);
    candidates.extend(clients.iter().copied());
    config
        .election
        .elect(service_key, &candidates)
        .unwrap_or(local.id)
}

impl<T> PubSubNode<T>
where
    T: TransportAdapter,
    T::Error: Display,
{
    /// Creates a node with its own registry.
    pub fn new(id: PeerId, transport: T, config: NodeConfig) -> Self {
        Self::with_registry(id, transport, config, ServiceManagerRegistry::new().into_shared())
    }

    /// Creates a node around an existing shared registry.
    pub fn with_registry(
        id: PeerId,
        transport: T,
        config: NodeConfig,
        registry: SharedRegistry,
    ) -> Self {
        Self {
            local: Client::new(id, &config.key_derivation),
            transport,
            clients: ClientList::new(),
            subscriptions: SubscriptionList::new(),
            protocol: Protocol::new(registry),
            config,
            stats: NodeStats::default(),
            inbox: Vec::new(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.local.id
    }

    pub fn client(&self) -> &Client {
        &self.local
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn clients(&self) -> &ClientList {
        &self.clients
    }

    pub fn subscriptions(&self) -> &SubscriptionList {
        &self.subscriptions
    }

    pub fn registry(&self) -> &SharedRegistry {
        self.protocol.registry()
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drains info messages delivered since the last call.
    pub fn take_inbox(&mut self) -> Vec<ReceivedMessage> {
        std::mem::take(&mut self.inbox)
    }

    /// Service key for `name` under this node's key derivation.
    pub fn service_key(&self, name: &str) -> ServiceKey {
        ServiceKey::from_name(&self.config.key_derivation, name)
    }

    /// Manager currently elected for `service_key` among known devices and self.
    pub fn elect(&self, service_key: &ServiceKey) -> PeerId {
        elect_manager(&self.local, &self.clients, &self.config, service_key)
    }

    fn split(&mut self) -> (&Protocol, NodeContext<'_, T>) {
        let Self {
            local,
            transport,
            subscriptions,
            protocol,
            config,
            stats,
            inbox,
            ..
        } = self;
        let protocol: &Protocol = protocol;
        let ctx = NodeContext {
            local_id: local.id,
            registry: protocol.registry(),
            transport,
            subscriptions,
            config,
            stats,
            inbox,
        };
        (protocol, ctx)
    }

    /// Registers with `manager` for `service_key`, locally when self is the manager.
    fn send_subscribe(
        &mut self,
        service_key: &ServiceKey,
        manager: PeerId,
    ) -> Result<(), NodeError> {
        if manager == self.local.id {
            let (created, _) = lock_registry(self.registry())
                .accept_subscriber(*service_key, manager)
                .map_err(ProtocolError::from)?;
            if created {
                info!(service = %service_key, "became service manager");
            }
            return Ok(());
        }
        let reliable = self.config.reliable_control;
        let (_, mut ctx) = self.split();
        ctx.send(&manager, &encode_subscribe(service_key), reliable)
    }

    /// Subscribes to `service_key`. Returns false when already subscribed.
    pub fn subscribe(&mut self, service_key: ServiceKey) -> Result<bool, NodeError> {
        let manager = self.elect(&service_key);
        if !subscribe_key(&mut self.subscriptions, service_key, manager) {
            debug!(service = %service_key, "already subscribed");
            return Ok(false);
        }
        if let Err(err) = self.send_subscribe(&service_key, manager) {
            self.subscriptions.remove(&service_key);
            return Err(err);
        }
        info!(service = %service_key, manager = %manager, "subscribed");
        Ok(true)
    }

    /// Subscribes to the service named `name` and returns its key.
    pub fn subscribe_named(&mut self, name: &str) -> Result<ServiceKey, NodeError> {
        let service_key = self.service_key(name);
        self.subscribe(service_key)?;
        if let Some(subscription) = self.subscriptions.find_mut(&service_key) {
            subscription.service_name = Some(name.to_string());
        }
        Ok(service_key)
    }

    /// Drops the local subscription and notifies its manager.
    /// Returns false when not subscribed.
    pub fn unsubscribe(&mut self, service_key: &ServiceKey) -> Result<bool, NodeError> {
        let Some(subscription) = self.subscriptions.take(service_key) else {
            return Ok(false);
        };
        let manager = subscription.manager;
        info!(service = %service_key, manager = %manager, "unsubscribed");
        if manager == self.local.id {
            let outcome = lock_registry(self.registry()).remove_subscriber(service_key, &manager);
            match outcome {
                Ok(_) => {
                    let (_, mut ctx) = self.split();
                    ctx.release_if_empty(service_key);
                }
                Err(RegistryError::NotManaged(_)) => {
                    debug!(service = %service_key, "local manager record already gone");
                }
            }
            return Ok(true);
        }
        let reliable = self.config.reliable_control;
        let (_, mut ctx) = self.split();
        ctx.send(&manager, &encode_unsubscribe(service_key), reliable)?;
        Ok(true)
    }

    /// Publishes `payload` to the elected manager of `service_key`.
    pub fn publish(&mut self, service_key: &ServiceKey, payload: &[u8]) -> Result<(), NodeError> {
        if payload.is_empty() {
            return Err(NodeError::EmptyPayload);
        }
        if let Some(max) = self.max_payload_len() {
            if payload.len() > max {
                return Err(NodeError::PayloadTooLarge {
                    len: payload.len(),
                    max,
                });
            }
        }
        let manager = self.elect(service_key);
        let reliable = self.config.reliable_data;
        let local_id = self.local.id;
        let (_, mut ctx) = self.split();
        if manager == local_id {
            ctx.on_publish(service_key, payload);
            return Ok(());
        }
        debug!(service = %service_key, manager = %manager, len = payload.len(), "publish");
        ctx.send(&manager, &encode_publish(service_key, payload), reliable)
    }

    /// Largest publish payload accepted by config and transport.
    pub fn max_payload_len(&self) -> Option<usize> {
        let transport_max = self
            .transport
            .max_payload_hint()
            .map(|hint| hint.saturating_sub(HEADER_LEN));
        match (self.config.max_payload_len, transport_max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Records a newly reachable device and re-runs election.
    /// Returns false for self or an already known device.
    pub fn on_client_joined(&mut self, id: PeerId) -> bool {
        if id == self.local.id {
            return false;
        }
        if !self
            .clients
            .insert_if_absent(Client::new(id, &self.config.key_derivation))
        {
            return false;
        }
        info!(peer = %id, clients = self.clients.len(), "client joined");
        self.rebalance();
        true
    }

    /// Forgets a device that is no longer reachable and re-runs election.
    pub fn on_client_left(&mut self, id: &PeerId) -> bool {
        if !self.clients.remove(id) {
            return false;
        }
        info!(peer = %id, clients = self.clients.len(), "client left");
        self.forget_subscriber(id);
        self.rebalance();
        true
    }

    /// Removes a departed device from every managed subscriber set and
    /// releases records left empty, all under one registry lock.
    fn forget_subscriber(&mut self, id: &PeerId) {
        let mut registry = lock_registry(self.protocol.registry());
        for service_key in registry.remove_subscriber_everywhere(id) {
            info!(service = %service_key, subscriber = %id, "departed subscriber removed");
            if self.config.retain_empty_managers {
                continue;
            }
            let empty = registry
                .manager(&service_key)
                .is_some_and(|m| m.subscribers().is_empty());
            if empty && registry.remove_manager(&service_key) {
                self.stats.released_managers += 1;
                info!(service = %service_key, "released empty service manager");
            }
        }
    }

    /// Moves own subscriptions to their current manager and drops manager
    /// records this device is no longer elected for.
    fn rebalance(&mut self) {
        let moves: Vec<(ServiceKey, PeerId)> = self
            .subscriptions
            .iter()
            .filter_map(|s| {
                let manager = self.elect(&s.service_key);
                (manager != s.manager).then_some((s.service_key, manager))
            })
            .collect();
        for (service_key, manager) in moves {
            let previous = reassign_manager(&mut self.subscriptions, &service_key, manager);
            self.stats.resubscriptions += 1;
            info!(
                service = %service_key,
                manager = %manager,
                previous = ?previous,
                "re-subscribing to new manager"
            );
            if let Err(err) = self.send_subscribe(&service_key, manager) {
                warn!(service = %service_key, manager = %manager, %err, "re-subscribe failed");
            }
        }

        let managed = lock_registry(self.registry()).managed_keys();
        for service_key in managed {
            if self.elect(&service_key) == self.local.id {
                continue;
            }
            if lock_registry(self.registry()).remove_manager(&service_key) {
                self.stats.released_managers += 1;
                info!(service = %service_key, "no longer elected, released service manager");
            }
        }
    }

    /// Transport upcall for one inbound packet.
    ///
    /// Rejections are counted and logged, then returned to the caller.
    pub fn handle_delivery(
        &mut self,
        bytes: &[u8],
        origin: &PeerId,
    ) -> Result<ReceiveEvent, ProtocolError> {
        self.stats.inbound_messages += 1;
        let (protocol, mut ctx) = self.split();
        let result = protocol.receive(bytes, origin, &mut ctx);
        if let Err(err) = &result {
            self.stats.rejected_messages += 1;
            warn!(origin = %origin, len = bytes.len(), %err, "rejected inbound packet");
        }
        result
    }

    /// Drains the transport inbound queue. Returns the number of packets accepted.
    pub fn pump(&mut self) -> usize {
        let mut accepted = 0;
        while let Some((origin, bytes)) = self.transport.recv() {
            if self.handle_delivery(&bytes, &origin).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }
}
