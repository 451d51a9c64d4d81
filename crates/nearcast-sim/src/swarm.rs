use nearcast_core::PeerId;
use nearcast_node::{NodeConfig, NodeStats, PubSubNode};
use nearcast_transport::{InMemoryAdapter, TransportAdapter};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

pub type SimNode = PubSubNode<InMemoryAdapter>;

/// Fully connected set of in-memory nodes.
///
/// Packets only move when [`Swarm::route`] runs, so tests can inspect the
/// network between hops.
pub struct Swarm {
    nodes: Vec<SimNode>,
    config: NodeConfig,
    rng: StdRng,
    loss_rate_percent: u8,
    dropped: usize,
}

impl Swarm {
    pub fn new(config: NodeConfig, seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            config,
            rng: StdRng::seed_from_u64(seed),
            loss_rate_percent: 0,
            dropped: 0,
        }
    }

    /// Builds a connected swarm of `count` nodes with random identifiers.
    pub fn with_random_nodes(count: usize, config: NodeConfig, seed: u64) -> Self {
        let mut swarm = Self::new(config, seed);
        while swarm.len() < count {
            let mut raw = [0_u8; 12];
            swarm.rng.fill_bytes(&mut raw);
            swarm.join(PeerId(raw));
        }
        swarm
    }

    /// Percentage of routed packets dropped in transit.
    pub fn set_loss_rate(&mut self, loss_rate_percent: u8) {
        self.loss_rate_percent = loss_rate_percent.min(100);
    }

    /// Adds a node and introduces it to every existing node, both ways.
    /// Returns false when `id` is already present.
    pub fn join(&mut self, id: PeerId) -> bool {
        if self.position(&id).is_some() {
            return false;
        }
        let mut node = PubSubNode::new(id, InMemoryAdapter::default(), self.config.clone());
        for existing in &mut self.nodes {
            node.on_client_joined(existing.id());
            existing.on_client_joined(id);
        }
        self.nodes.push(node);
        true
    }

    /// Removes a node; the rest see it leave. Packets queued for it are lost.
    pub fn leave(&mut self, id: &PeerId) -> Option<SimNode> {
        let idx = self.position(id)?;
        let node = self.nodes.remove(idx);
        for remaining in &mut self.nodes {
            remaining.on_client_left(id);
        }
        Some(node)
    }

    fn position(&self, id: &PeerId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == *id)
    }

    pub fn node(&self, id: &PeerId) -> Option<&SimNode> {
        self.nodes.iter().find(|n| n.id() == *id)
    }

    pub fn node_mut(&mut self, id: &PeerId) -> Option<&mut SimNode> {
        self.nodes.iter_mut().find(|n| n.id() == *id)
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [SimNode] {
        &mut self.nodes
    }

    pub fn ids(&self) -> Vec<PeerId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Packets lost in transit so far, by loss rate or unknown destination.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Moves every queued outbound packet to its destination's inbound queue.
    /// Returns the number of packets delivered.
    pub fn route(&mut self) -> usize {
        let mut in_flight = Vec::new();
        for node in &mut self.nodes {
            let origin = node.id();
            for packet in node.transport_mut().take_outbound() {
                in_flight.push((origin, packet));
            }
        }

        let mut delivered = 0;
        for (origin, packet) in in_flight {
            if self.loss_rate_percent > 0 && self.rng.gen_range(0..100_u8) < self.loss_rate_percent
            {
                self.dropped += 1;
                continue;
            }
            match self.nodes.iter_mut().find(|n| n.id() == packet.peer) {
                Some(dest) => {
                    dest.transport_mut().enqueue_inbound(origin, packet.bytes);
                    delivered += 1;
                }
                None => {
                    debug!(origin = %origin, peer = %packet.peer, "no route to peer");
                    self.dropped += 1;
                }
            }
        }
        delivered
    }

    /// Drains every node's inbound queue. Returns packets accepted.
    pub fn pump_all(&mut self) -> usize {
        self.nodes.iter_mut().map(|n| n.pump()).sum()
    }

    /// Alternates routing and pumping until nothing moves or `max_rounds`
    /// is reached. Returns the number of rounds that moved packets.
    pub fn settle(&mut self, max_rounds: usize) -> usize {
        let mut rounds = 0;
        while rounds < max_rounds {
            if self.route() == 0 && self.pending_inbound() == 0 {
                break;
            }
            self.pump_all();
            rounds += 1;
        }
        rounds
    }

    fn pending_inbound(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.transport().pending_inbound())
            .sum()
    }

    /// Sum of per-node counters.
    pub fn total_stats(&self) -> NodeStats {
        let mut total = NodeStats::default();
        for node in &self.nodes {
            let s = node.stats();
            total.inbound_messages += s.inbound_messages;
            total.rejected_messages += s.rejected_messages;
            total.subscribe_requests += s.subscribe_requests;
            total.unsubscribe_requests += s.unsubscribe_requests;
            total.publish_requests += s.publish_requests;
            total.unmanaged_publishes += s.unmanaged_publishes;
            total.delivered_messages += s.delivered_messages;
            total.unsolicited_infos += s.unsolicited_infos;
            total.outbound_messages += s.outbound_messages;
            total.send_failures += s.send_failures;
            total.resubscriptions += s.resubscriptions;
            total.released_managers += s.released_managers;
        }
        total
    }

    /// Reliable sends requested across all adapters.
    pub fn reliable_sends(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| n.transport().health_snapshot().outbound_reliable)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use nearcast_core::{PeerId, ServiceKey};
    use nearcast_node::NodeConfig;

    use super::Swarm;

    #[test]
    fn join_connects_every_pair() {
        let swarm = Swarm::with_random_nodes(4, NodeConfig::default(), 7);
        assert_eq!(swarm.len(), 4);
        for node in swarm.nodes() {
            assert_eq!(node.clients().len(), 3);
        }
    }

    #[test]
    fn duplicate_join_and_unknown_leave_are_rejected() {
        let mut swarm = Swarm::new(NodeConfig::default(), 1);
        assert!(swarm.join(PeerId([1; 12])));
        assert!(!swarm.join(PeerId([1; 12])));
        assert!(swarm.leave(&PeerId([2; 12])).is_none());
        assert!(swarm.leave(&PeerId([1; 12])).is_some());
        assert!(swarm.is_empty());
    }

    #[test]
    fn packets_to_departed_nodes_are_dropped() {
        let mut swarm = Swarm::new(NodeConfig::default(), 1);
        swarm.join(PeerId([1; 12]));
        swarm.join(PeerId([2; 12]));
        swarm
            .node_mut(&PeerId([1; 12]))
            .expect("node present")
            .subscribe(ServiceKey([9; 20]))
            .expect("subscribe");

        assert!(swarm.leave(&PeerId([2; 12])).is_some());
        assert_eq!(swarm.route(), 0);
        assert_eq!(swarm.dropped(), 1);
    }

    #[test]
    fn full_loss_drops_everything() {
        let mut swarm = Swarm::new(NodeConfig::default(), 3);
        swarm.join(PeerId([1; 12]));
        swarm.join(PeerId([2; 12]));
        swarm.set_loss_rate(200);
        swarm
            .node_mut(&PeerId([1; 12]))
            .expect("node present")
            .subscribe(ServiceKey([9; 20]))
            .expect("subscribe");
        assert_eq!(swarm.route(), 0);
        assert_eq!(swarm.dropped(), 1);
    }
}
