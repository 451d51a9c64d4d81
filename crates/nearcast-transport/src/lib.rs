//! Transport abstractions for nearcast.
//!
//! The node only depends on the byte-oriented adapter trait defined here;
//! real proximity transports live outside this workspace.

pub mod adapter;

pub use adapter::{
    route_in_memory_outbound, InMemoryAdapter, OutboundPacket, TransportAdapter,
    TransportHealthSnapshot,
};
