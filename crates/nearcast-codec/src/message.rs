use std::fmt;

use nearcast_core::ServiceKey;

/// Packet kinds carried in the leading type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Subscribe = 0,
    Unsubscribe = 1,
    Publish = 2,
    Info = 3,
    /// Any code outside the four known kinds, or no code at all.
    Invalid = 0xFF,
}

impl MessageType {
    /// Maps a wire code to its kind; unknown codes are [`MessageType::Invalid`].
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Subscribe,
            1 => Self::Unsubscribe,
            2 => Self::Publish,
            3 => Self::Info,
            _ => Self::Invalid,
        }
    }

    /// Wire code for a valid kind. `Invalid` has no wire code.
    pub fn code(self) -> Option<u8> {
        match self {
            Self::Invalid => None,
            other => Some(other as u8),
        }
    }

    /// Whether this kind carries a payload tail after the service key.
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::Publish | Self::Info)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish => "publish",
            Self::Info => "info",
            Self::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Decoded view of one packet, borrowing its payload from the inbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireMessage<'a> {
    pub kind: MessageType,
    pub service_key: ServiceKey,
    /// Empty for subscribe/unsubscribe, non-empty for publish/info.
    pub payload: &'a [u8],
}
