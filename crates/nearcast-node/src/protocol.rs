use nearcast_codec::{decode, CodecError, MessageType};
use nearcast_core::{PeerId, ServiceKey};
use thiserror::Error;
use tracing::{debug, info};

use crate::registry::{
    lock_registry, RegistryError, SharedRegistry, SubscribeOutcome, UnsubscribeOutcome,
};

/// What a successfully processed inbound packet did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// Origin was added to (or already in) the subscriber set.
    Subscribed {
        service_key: ServiceKey,
        origin: PeerId,
        outcome: SubscribeOutcome,
        /// A manager record was created for this packet.
        became_manager: bool,
    },
    Unsubscribed {
        service_key: ServiceKey,
        origin: PeerId,
        outcome: UnsubscribeOutcome,
    },
    /// Publish handed to the handler; the registry was not touched.
    Published {
        service_key: ServiceKey,
        payload_len: usize,
    },
    /// Info handed to the handler.
    Info {
        service_key: ServiceKey,
        payload_len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Upcalls made by [`Protocol::receive`] after a packet is validated.
///
/// Subscription callbacks run after the registry was updated and its lock
/// released, so implementations may lock the registry again.
pub trait ProtocolHandler {
    fn on_subscribe_request(
        &mut self,
        _service_key: &ServiceKey,
        _origin: &PeerId,
        _outcome: SubscribeOutcome,
    ) {
    }

    fn on_unsubscribe_request(
        &mut self,
        _service_key: &ServiceKey,
        _origin: &PeerId,
        _outcome: UnsubscribeOutcome,
    ) {
    }

    fn on_publish(&mut self, service_key: &ServiceKey, payload: &[u8]);

    fn on_info(&mut self, service_key: &ServiceKey, payload: &[u8]);
}

/// Receive-side dispatch over a shared manager registry.
#[derive(Debug, Clone)]
pub struct Protocol {
    registry: SharedRegistry,
}

impl Protocol {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Classifies, validates and dispatches one inbound packet from `origin`.
    ///
    /// Validation happens before any mutation: a rejected packet leaves the
    /// registry untouched and makes no upcall.
    pub fn receive<H>(
        &self,
        buffer: &[u8],
        origin: &PeerId,
        handler: &mut H,
    ) -> Result<ReceiveEvent, ProtocolError>
    where
        H: ProtocolHandler + ?Sized,
    {
        let message = decode(buffer)?;
        let service_key = message.service_key;
        match message.kind {
            MessageType::Subscribe => {
                let (became_manager, outcome) =
                    lock_registry(&self.registry).accept_subscriber(service_key, *origin)?;
                if became_manager {
                    info!(service = %service_key, "became service manager");
                }
                debug!(service = %service_key, origin = %origin, ?outcome, "subscribe request");
                handler.on_subscribe_request(&service_key, origin, outcome);
                Ok(ReceiveEvent::Subscribed {
                    service_key,
                    origin: *origin,
                    outcome,
                    became_manager,
                })
            }
            MessageType::Unsubscribe => {
                let outcome =
                    lock_registry(&self.registry).remove_subscriber(&service_key, origin)?;
                debug!(service = %service_key, origin = %origin, ?outcome, "unsubscribe request");
                handler.on_unsubscribe_request(&service_key, origin, outcome);
                Ok(ReceiveEvent::Unsubscribed {
                    service_key,
                    origin: *origin,
                    outcome,
                })
            }
            MessageType::Publish => {
                let len = message.payload.len();
                debug!(service = %service_key, origin = %origin, len, "publish");
                handler.on_publish(&service_key, message.payload);
                Ok(ReceiveEvent::Published {
                    service_key,
                    payload_len: len,
                })
            }
            MessageType::Info => {
                let len = message.payload.len();
                debug!(service = %service_key, origin = %origin, len, "info");
                handler.on_info(&service_key, message.payload);
                Ok(ReceiveEvent::Info {
                    service_key,
                    payload_len: len,
                })
            }
            // decode never yields Invalid; keep the match total.
            MessageType::Invalid => Err(CodecError::InvalidMessageType(
                buffer.first().copied().unwrap_or(u8::MAX),
            )
            .into()),
        }
    }
}
