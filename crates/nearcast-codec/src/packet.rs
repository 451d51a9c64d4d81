use nearcast_core::{ServiceKey, SERVICE_KEY_LEN};

use crate::error::CodecError;
use crate::message::{MessageType, WireMessage};

/// Width of the leading type field.
pub const MESSAGE_TYPE_LEN: usize = 1;
/// Fixed prefix length: type byte plus service key.
pub const HEADER_LEN: usize = MESSAGE_TYPE_LEN + SERVICE_KEY_LEN;

/// Concatenates fields in order with no delimiters.
///
/// Framing relies on the fixed-width prefixes; whatever follows the last
/// fixed field is payload.
pub fn build_packet(fields: &[&[u8]]) -> Vec<u8> {
    let size = fields.iter().map(|f| f.len()).sum();
    let mut out = Vec::with_capacity(size);
    for field in fields {
        out.extend_from_slice(field);
    }
    out
}

fn encode_message(code: u8, service_key: &ServiceKey, payload: &[u8]) -> Vec<u8> {
    build_packet(&[&[code], service_key.as_bytes(), payload])
}

/// Encodes a subscribe request (`HEADER_LEN` bytes).
pub fn encode_subscribe(service_key: &ServiceKey) -> Vec<u8> {
    encode_message(MessageType::Subscribe as u8, service_key, &[])
}

/// Encodes an unsubscribe request (`HEADER_LEN` bytes).
pub fn encode_unsubscribe(service_key: &ServiceKey) -> Vec<u8> {
    encode_message(MessageType::Unsubscribe as u8, service_key, &[])
}

/// Encodes a publish request carrying `payload`.
pub fn encode_publish(service_key: &ServiceKey, payload: &[u8]) -> Vec<u8> {
    encode_message(MessageType::Publish as u8, service_key, payload)
}

/// Encodes an info message carrying `payload`.
pub fn encode_info(service_key: &ServiceKey, payload: &[u8]) -> Vec<u8> {
    encode_message(MessageType::Info as u8, service_key, payload)
}

/// Classifies a packet from its first byte only.
pub fn classify(buffer: &[u8]) -> MessageType {
    match buffer.first() {
        Some(code) => MessageType::from_code(*code),
        None => MessageType::Invalid,
    }
}

/// Classifies and validates a packet, slicing out key and payload.
///
/// Subscribe/unsubscribe must be exactly `HEADER_LEN` bytes. Publish/info
/// must be longer than `HEADER_LEN`; a zero-length payload is rejected.
pub fn decode(buffer: &[u8]) -> Result<WireMessage<'_>, CodecError> {
    let Some(&code) = buffer.first() else {
        return Err(CodecError::EmptyPacket);
    };
    let kind = MessageType::from_code(code);
    match kind {
        MessageType::Invalid => return Err(CodecError::InvalidMessageType(code)),
        MessageType::Subscribe | MessageType::Unsubscribe => {
            if buffer.len() != HEADER_LEN {
                return Err(CodecError::MalformedLength {
                    kind,
                    expected: "exactly 21 bytes",
                    actual: buffer.len(),
                });
            }
        }
        MessageType::Publish | MessageType::Info => {
            if buffer.len() <= HEADER_LEN {
                return Err(CodecError::MalformedLength {
                    kind,
                    expected: "more than 21 bytes",
                    actual: buffer.len(),
                });
            }
        }
    }

    let mut key = [0_u8; SERVICE_KEY_LEN];
    key.copy_from_slice(&buffer[MESSAGE_TYPE_LEN..HEADER_LEN]);
    Ok(WireMessage {
        kind,
        service_key: ServiceKey(key),
        payload: &buffer[HEADER_LEN..],
    })
}
