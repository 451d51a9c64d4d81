use nearcast_core::ServiceKey;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::swarm::Swarm;

/// Routing rounds allowed for one publish to reach every subscriber.
const SETTLE_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct LossScenario {
    pub loss_rate_percent: u8,
}

pub const PRACTICAL_BASELINE: LossScenario = LossScenario {
    loss_rate_percent: 10,
};

/// Outcome of [`run_publish_rounds`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioReport {
    pub rounds: usize,
    pub published: usize,
    pub publish_errors: usize,
    /// Sum over rounds of the subscriber count of the published service.
    pub expected_deliveries: usize,
    pub delivered: usize,
    pub dropped_packets: usize,
}

impl ScenarioReport {
    pub fn delivery_ratio(&self) -> f64 {
        if self.expected_deliveries == 0 {
            return 1.0;
        }
        self.delivered as f64 / self.expected_deliveries as f64
    }
}

/// Subscribes each node to a random subset of `service_names`, then runs
/// `rounds` publishes from random nodes to random services and counts the
/// info messages that reach subscriber inboxes.
pub fn run_publish_rounds(
    swarm: &mut Swarm,
    service_names: &[&str],
    rounds: usize,
) -> ScenarioReport {
    let mut report = ScenarioReport {
        rounds,
        ..ScenarioReport::default()
    };
    if swarm.is_empty() || service_names.is_empty() {
        return report;
    }

    for idx in 0..swarm.len() {
        for name in service_names {
            if !swarm.rng_mut().gen_bool(0.5) {
                continue;
            }
            let node = &mut swarm.nodes_mut()[idx];
            if let Err(err) = node.subscribe_named(name) {
                warn!(node = %node.id(), service = name, %err, "subscribe failed");
            }
        }
    }
    swarm.settle(SETTLE_ROUNDS);

    let ids = swarm.ids();
    for round in 0..rounds {
        let (Some(publisher), Some(name)) = (
            ids.choose(swarm.rng_mut()).copied(),
            service_names.choose(swarm.rng_mut()).copied(),
        ) else {
            break;
        };
        let Some(node) = swarm.node_mut(&publisher) else {
            continue;
        };
        let service_key = node.service_key(name);
        let payload = format!("round-{round}");
        match node.publish(&service_key, payload.as_bytes()) {
            Ok(()) => report.published += 1,
            Err(err) => {
                report.publish_errors += 1;
                warn!(node = %publisher, service = name, %err, "publish failed");
                continue;
            }
        }
        report.expected_deliveries += subscriber_count(swarm, &service_key);
        swarm.settle(SETTLE_ROUNDS);

        for node in swarm.nodes_mut() {
            report.delivered += node
                .take_inbox()
                .iter()
                .filter(|m| m.service_key == service_key && m.payload == payload.as_bytes())
                .count();
        }
    }
    report.dropped_packets = swarm.dropped();
    info!(
        rounds = report.rounds,
        published = report.published,
        delivered = report.delivered,
        expected = report.expected_deliveries,
        dropped = report.dropped_packets,
        "publish scenario finished"
    );
    report
}

fn subscriber_count(swarm: &Swarm, service_key: &ServiceKey) -> usize {
    swarm
        .nodes()
        .iter()
        .filter(|n| n.subscriptions().contains(service_key))
        .count()
}
