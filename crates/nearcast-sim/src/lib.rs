//! In-memory swarm harness for nearcast.
//!
//! Runs many `PubSubNode`s over `InMemoryAdapter`s with explicit routing
//! rounds, optional packet loss, and scripted publish scenarios.

pub mod scenarios;
pub mod swarm;

pub use scenarios::{run_publish_rounds, LossScenario, ScenarioReport, PRACTICAL_BASELINE};
pub use swarm::{SimNode, Swarm};
