//! # State Channel Node
//!
//! Runs one node on an in-memory bus and chain until interrupted.
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (`RUST_LOG`, default `info`)
//! 2. Load `NodeConfig` from `SC_*` environment variables and validate it
//! 3. Derive the node key from `SC_NODE_SEED`, or generate one
//! 4. Wire the node and start its inbound loop
//! 5. Wait for ctrl-c, then shut down

use std::sync::Arc;

use anyhow::{Context, Result};
use node_runtime::{MemoryChain, MessageBus, Node, NodeConfig};
use shared_crypto::ExtendedPrivateKey;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = NodeConfig::from_env().context("Failed to load node configuration")?;
    config.validate().context("Invalid node configuration")?;

    let key = match &config.key_seed {
        Some(seed) => ExtendedPrivateKey::from_seed(seed).context("Invalid SC_NODE_SEED")?,
        None => {
            info!("[node] no SC_NODE_SEED set, generating a fresh key");
            ExtendedPrivateKey::random()
        }
    };

    info!("===========================================");
    info!("  State Channel Node v{}", node_runtime::VERSION);
    info!("===========================================");

    let bus = MessageBus::new();
    let chain = Arc::new(MemoryChain::new());
    let node = Node::new(config, key, bus, chain);
    let inbound = node.start();
    info!(identifier = node.public_identifier(), "[node] ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("[node] shutting down");
    node.shutdown();
    inbound.await.context("Inbound loop panicked")?;
    Ok(())
}
