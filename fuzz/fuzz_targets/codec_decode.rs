#![no_main]

use libfuzzer_sys::fuzz_target;
use nearcast_codec::{classify, decode, HEADER_LEN};

fuzz_target!(|data: &[u8]| {
    let kind = classify(data);
    if let Ok(msg) = decode(data) {
        assert_eq!(msg.kind, kind);
        assert_eq!(msg.payload.len() + HEADER_LEN, data.len());
    }
});
