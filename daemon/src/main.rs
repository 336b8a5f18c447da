//! strand daemon — entry point for running a strand node.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use strand_ledger::Ledger;
use strand_node::{logging, Node, NodeConfig, NodeInit};
use strand_nullables::NullLedger;
use strand_types::NetworkId;

#[derive(Parser)]
#[command(name = "strand_node", about = "strand currency node daemon")]
struct Cli {
    /// Network to join: "live", "beta", or "test".
    #[arg(long, default_value = "live", env = "STRAND_NETWORK")]
    network: String,

    /// Path to the JSON configuration file. Created with defaults when
    /// missing; rewritten in place when an older version is migrated.
    #[arg(long, default_value = "./config.json", env = "STRAND_CONFIG")]
    config: PathBuf,

    /// Override the UDP peering port.
    #[arg(long, env = "STRAND_PEERING_PORT")]
    peering_port: Option<u16>,
}

fn parse_network(s: &str) -> anyhow::Result<NetworkId> {
    match s.to_lowercase().as_str() {
        "live" => Ok(NetworkId::Live),
        "beta" => Ok(NetworkId::Beta),
        "test" => Ok(NetworkId::Test),
        other => anyhow::bail!("unknown network {other:?} (expected live, beta, or test)"),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let network = parse_network(&cli.network)?;
    let mut config = if cli.config.exists() {
        let (config, upgraded) = NodeConfig::from_json_file(&cli.config)?;
        if upgraded {
            tracing::info!(path = %cli.config.display(), "configuration migrated");
            config.save_json_file(&cli.config)?;
        }
        config
    } else {
        let config = NodeConfig::new(network);
        config.save_json_file(&cli.config)?;
        tracing::info!(path = %cli.config.display(), "default configuration written");
        config
    };
    if let Some(port) = cli.peering_port {
        config.peering_port = port;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.io_threads.max(1) as usize)
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    // The block store and wallet are external facilities; their init results
    // feed the two-flag startup check. This build ships with the in-memory
    // ledger stand-in, so both initialize trivially.
    let init = NodeInit::default();
    if init.error() {
        anyhow::bail!("collaborator initialization failed, refusing to start");
    }
    let ledger: Arc<dyn Ledger> = Arc::new(NullLedger::new());

    let node = Node::new(config, ledger, Vec::new()).await?;
    node.start();
    tracing::info!(
        endpoint = %node.network.local_endpoint(),
        "node running, ctrl-c to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    node.stop();
    node.join().await;
    Ok(())
}
