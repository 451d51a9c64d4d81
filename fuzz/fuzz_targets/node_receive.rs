#![no_main]

use libfuzzer_sys::fuzz_target;
use nearcast_core::PeerId;
use nearcast_node::{NodeConfig, PubSubNode};
use nearcast_transport::InMemoryAdapter;

fuzz_target!(|data: &[u8]| {
    let mut node = PubSubNode::new(
        PeerId([0xEE; 12]),
        InMemoryAdapter::default(),
        NodeConfig::default(),
    );
    node.on_client_joined(PeerId([0x01; 12]));
    let origin = PeerId([0x01; 12]);
    for chunk in data.split(|b| *b == 0xFF) {
        let _ = node.handle_delivery(chunk, &origin);
    }
});
