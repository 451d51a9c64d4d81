//! nearcast wire codec primitives.
//!
//! Defines the message taxonomy and the fixed-prefix packet layout
//! `[type:1][service key:20][payload:rest]`, with encode, classify and
//! validating decode helpers.

pub mod error;
pub mod message;
pub mod packet;

pub use error::CodecError;
pub use message::{MessageType, WireMessage};
pub use packet::{
    build_packet, classify, decode, encode_info, encode_publish, encode_subscribe,
    encode_unsubscribe, HEADER_LEN, MESSAGE_TYPE_LEN,
};
