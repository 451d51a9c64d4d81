use std::panic;

use nearcast_codec::{classify, decode, encode_publish, encode_subscribe, MessageType, HEADER_LEN};
use nearcast_core::ServiceKey;

fn xorshift64(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut s = seed.max(1);
    let mut out = vec![0_u8; len];
    for b in &mut out {
        *b = (xorshift64(&mut s) & 0xFF) as u8;
    }
    out
}

#[test]
fn decode_never_panics_on_random_inputs() {
    for seed in 1_u64..=2_000 {
        let len = (seed as usize * 7) % 96;
        let input = random_bytes(seed, len);
        let result = panic::catch_unwind(|| {
            let kind = classify(&input);
            let decoded = decode(&input);
            (kind, decoded.map(|m| (m.kind, m.payload.len())))
        });
        let (kind, decoded) = result.expect("decode must not panic");
        if let Ok((decoded_kind, payload_len)) = decoded {
            assert_eq!(kind, decoded_kind);
            assert_eq!(payload_len + HEADER_LEN, input.len());
        }
    }
}

#[test]
fn decode_never_panics_on_mutated_valid_packets() {
    let key = ServiceKey([0x5A; 20]);
    let seeds = [
        encode_subscribe(&key),
        encode_publish(&key, b"payload-bytes"),
    ];
    for (i, base) in seeds.iter().enumerate() {
        for seed in 1_u64..=500 {
            let mut s = seed + (i as u64) * 10_000;
            let mut input = base.clone();
            let flips = (xorshift64(&mut s) % 4) as usize + 1;
            for _ in 0..flips {
                let idx = (xorshift64(&mut s) as usize) % input.len();
                input[idx] ^= (xorshift64(&mut s) & 0xFF) as u8;
            }
            let cut = (xorshift64(&mut s) as usize) % (input.len() + 1);
            input.truncate(cut);

            let result = panic::catch_unwind(|| decode(&input).is_ok());
            let accepted = result.expect("decode must not panic");
            if accepted {
                assert_ne!(classify(&input), MessageType::Invalid);
            }
        }
    }
}
