use std::collections::VecDeque;

use nearcast_core::PeerId;

/// Coarse per-adapter transport health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHealthSnapshot {
    pub outbound_queued: u64,
    pub outbound_send_ok: u64,
    pub outbound_send_err: u64,
    pub outbound_reliable: u64,
    pub inbound_received: u64,
    pub last_error: Option<String>,
}

/// Byte-oriented transport contract used by the nearcast node.
///
/// Delivery is a single hop to a directly reachable device. Packets handed to
/// `send` are already framed; the adapter must deliver them unchanged.
pub trait TransportAdapter {
    /// Transport-specific send error.
    type Error;

    /// Sends `bytes` to `peer`. `reliable` requests the transport's
    /// acknowledged mode when it has one; adapters without one ignore it.
    fn send(&mut self, peer: &PeerId, bytes: &[u8], reliable: bool) -> Result<(), Self::Error>;
    /// Returns the next inbound packet and the device that sent it.
    fn recv(&mut self) -> Option<(PeerId, Vec<u8>)>;

    /// Optional cap on a single outbound packet, in bytes.
    fn max_payload_hint(&self) -> Option<usize> {
        None
    }

    /// Best-effort transport health counters.
    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot::default()
    }
}

/// One captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    pub peer: PeerId,
    pub bytes: Vec<u8>,
    pub reliable: bool,
}

/// In-memory adapter for tests and simulations.
#[derive(Debug, Clone)]
pub struct InMemoryAdapter {
    inbound: VecDeque<(PeerId, Vec<u8>)>,
    outbound: Vec<OutboundPacket>,
    payload_hint: Option<usize>,
    max_send_bytes: usize,
    drop_outbound: bool,
    send_ok: u64,
    send_err: u64,
    send_reliable: u64,
    recv_ok: u64,
    last_error: Option<&'static str>,
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            payload_hint: None,
            max_send_bytes: usize::MAX,
            drop_outbound: false,
            send_ok: 0,
            send_err: 0,
            send_reliable: 0,
            recv_ok: 0,
            last_error: None,
        }
    }
}

impl InMemoryAdapter {
    /// Creates an adapter that advertises a max payload hint but does not
    /// enforce it.
    pub fn with_payload_hint(max_payload_hint: usize) -> Self {
        Self {
            payload_hint: Some(max_payload_hint),
            ..Self::default()
        }
    }

    /// Creates an adapter that rejects sends larger than `max_send_bytes`.
    pub fn with_max_send_bytes(max_send_bytes: usize) -> Self {
        Self {
            payload_hint: Some(max_send_bytes),
            max_send_bytes,
            ..Self::default()
        }
    }

    /// Queues bytes as inbound traffic from `peer`.
    pub fn enqueue_inbound(&mut self, peer: PeerId, bytes: Vec<u8>) {
        self.inbound.push_back((peer, bytes));
    }

    /// Drains and returns all outbound sends captured so far.
    pub fn take_outbound(&mut self) -> Vec<OutboundPacket> {
        std::mem::take(&mut self.outbound)
    }

    /// Number of inbound packets not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// If enabled, outbound sends are silently dropped (loss simulation).
    pub fn set_drop_outbound(&mut self, drop_outbound: bool) {
        self.drop_outbound = drop_outbound;
    }
}

/// Moves captured outbound packets addressed to `to_peer` from one in-memory
/// adapter into another adapter's inbound queue, tagging them as sent by
/// `from_peer`.
///
/// Packets for other peers stay queued on `from_adapter`. Returns the number
/// of packets moved.
pub fn route_in_memory_outbound(
    from_adapter: &mut InMemoryAdapter,
    to_adapter: &mut InMemoryAdapter,
    from_peer: PeerId,
    to_peer: PeerId,
) -> usize {
    let (matching, rest): (Vec<_>, Vec<_>) = from_adapter
        .take_outbound()
        .into_iter()
        .partition(|packet| packet.peer == to_peer);
    from_adapter.outbound = rest;
    let moved = matching.len();
    for packet in matching {
        to_adapter.enqueue_inbound(from_peer, packet.bytes);
    }
    moved
}

impl TransportAdapter for InMemoryAdapter {
    type Error = &'static str;

    fn send(&mut self, peer: &PeerId, bytes: &[u8], reliable: bool) -> Result<(), Self::Error> {
        if bytes.len() > self.max_send_bytes {
            self.send_err += 1;
            self.last_error = Some("payload exceeds max_send_bytes");
            return Err("payload exceeds max_send_bytes");
        }
        if self.drop_outbound {
            self.send_err += 1;
            self.last_error = Some("outbound dropped");
            return Ok(());
        }
        self.outbound.push(OutboundPacket {
            peer: *peer,
            bytes: bytes.to_vec(),
            reliable,
        });
        self.send_ok += 1;
        if reliable {
            self.send_reliable += 1;
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<(PeerId, Vec<u8>)> {
        let msg = self.inbound.pop_front();
        if msg.is_some() {
            self.recv_ok += 1;
        }
        msg
    }

    fn max_payload_hint(&self) -> Option<usize> {
        self.payload_hint
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot {
            outbound_queued: self.outbound.len() as u64,
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            outbound_reliable: self.send_reliable,
            inbound_received: self.recv_ok,
            last_error: self.last_error.map(str::to_string),
        }
    }
}
