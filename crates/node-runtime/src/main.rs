//! # VeloChain Node Runtime
//!
//! The main entry point for the VeloChain node.
//!
//! ## Architecture
//!
//! The node is the parallel transaction core wired end to end:
//!
//! 1. Validator Registry (stake table, rewards)
//! 2. Mempool (admission, dependency analysis, level batching)
//! 3. Parallel Executor (worker pool, snapshot/merge)
//! 4. Block Loop (fixed-interval production)
//!
//! Initialisation follows that order; teardown reverses it via the shared
//! cancellation token.

use anyhow::Result;
use node_runtime::config::NodeConfig;
use node_runtime::genesis::GenesisSpec;
use node_runtime::node::Node;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  VeloChain Node Runtime v0.1.0");
    info!("===========================================");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            NodeConfig::load(&path)?
        }
        None => NodeConfig::default(),
    };

    let node = Node::build(config, &GenesisSpec::dev())?;

    let runner = {
        let block_loop = node.block_loop.clone();
        tokio::spawn(async move { block_loop.run().await })
    };

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down gracefully...");
    node.shutdown();
    runner.await??;

    Ok(())
}
