use std::path::PathBuf;

use clap::Parser;
use nearcast_node::NodeConfig;
use nearcast_sim::{run_publish_rounds, Swarm};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Run a nearcast pub/sub swarm in memory", long_about = None)]
struct Cli {
    /// Path to a node configuration file (TOML)
    #[arg(long, short, env = "NEARCAST_CONFIG")]
    config: Option<PathBuf>,
    /// Number of devices in the swarm
    #[arg(long, default_value_t = 8)]
    nodes: usize,
    /// Seed for identifiers, subscriptions and publishers
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
    /// Publish rounds to run
    #[arg(long, default_value_t = 32)]
    rounds: usize,
    /// Percentage of packets dropped in transit
    #[arg(long, default_value_t = 0)]
    loss: u8,
    /// Service names devices subscribe to
    #[arg(long, value_delimiter = ',', default_value = "weather,traffic,news")]
    services: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = std::env::var("NEARCAST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    info!(
        nodes = cli.nodes,
        seed = cli.seed,
        election = ?config.election,
        key_derivation = ?config.key_derivation,
        "starting swarm"
    );

    let mut swarm = Swarm::with_random_nodes(cli.nodes, config, cli.seed);
    swarm.set_loss_rate(cli.loss);
    let services: Vec<&str> = cli.services.iter().map(String::as_str).collect();
    let report = run_publish_rounds(&mut swarm, &services, cli.rounds);
    let stats = swarm.total_stats();

    println!("nodes:              {}", swarm.len());
    println!("published:          {}", report.published);
    println!("publish errors:     {}", report.publish_errors);
    println!(
        "delivered:          {}/{} ({:.1}%)",
        report.delivered,
        report.expected_deliveries,
        report.delivery_ratio() * 100.0
    );
    println!("dropped packets:    {}", report.dropped_packets);
    println!("rejected inbound:   {}", stats.rejected_messages);
    println!("send failures:      {}", stats.send_failures);
    Ok(())
}
