use thiserror::Error;

use crate::message::MessageType;

/// Errors returned by packet decode/validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Zero-length buffer; there is no type byte to classify.
    #[error("empty packet")]
    EmptyPacket,
    /// Leading byte is not one of the known type codes.
    #[error("invalid message type: {0:#04x}")]
    InvalidMessageType(u8),
    /// Buffer length does not satisfy the framing rule for its type.
    #[error("malformed {kind} packet: expected {expected}, got {actual} bytes")]
    MalformedLength {
        kind: MessageType,
        expected: &'static str,
        actual: usize,
    },
}
