#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! meshcache node entrypoint.

use std::sync::Arc;

use clap::Parser;
use meshcache::core::config::NodeConfig;
use meshcache::core::types::{NodeDescriptor, Timestamp};
use meshcache::core::SharedCore;
use meshcache::monitoring::metrics::Metrics;
use meshcache::node;
use meshcache::transport::tcp::PeerClientPool;
use tracing::{error, info};

/// A node in a meshcache cluster: a distributed in-memory key/value cache
/// routed by consistent hashing over the peer set.
#[derive(Parser, Debug)]
#[command(name = "meshcache", version, about)]
struct Cli {
    /// This node's opaque, cluster-unique identifier.
    #[arg(long)]
    node_id: String,

    /// Address the client-facing API socket binds to.
    #[arg(long)]
    api_addr: String,

    /// Address the peer request socket binds to.
    #[arg(long)]
    request_addr: String,

    /// Address the publish socket binds to.
    #[arg(long)]
    publish_addr: String,

    /// An existing peer's request address to bootstrap membership from.
    #[arg(long)]
    node: Option<String>,

    /// Optional TOML configuration file (§6, SPEC_FULL.md §A.3).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_target(false).with_level(true).compact().try_init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    config.validate()?;

    let self_descriptor = NodeDescriptor {
        node_id: cli.node_id.clone(),
        request_addr: cli.request_addr.clone(),
        publish_addr: cli.publish_addr.clone(),
        last_seen: Timestamp::now(),
    };

    let core = Arc::new(SharedCore::new(self_descriptor, config));
    let dispatch = Arc::new(PeerClientPool::new());
    let metrics = Arc::new(Metrics::new().map_err(|e| anyhow::anyhow!("metrics init failed: {e}"))?);

    info!(node_id = %cli.node_id, "meshcache node starting");

    let handles = node::spawn_node(
        core.clone(),
        dispatch.clone(),
        metrics,
        &cli.api_addr,
        &cli.request_addr,
        &cli.publish_addr,
    )
    .await?;

    if let Some(peer_request_addr) = &cli.node {
        node::bootstrap(&core, &dispatch, peer_request_addr).await?;
    }

    tokio::select! {
        result = handles.request_listener => {
            if let Err(e) = result {
                error!(error = %e, "request listener task panicked");
            }
        }
        result = handles.api_listener => {
            if let Err(e) = result {
                error!(error = %e, "API listener task panicked");
            }
        }
        result = handles.membership_loop => {
            if let Err(e) = result {
                error!(error = %e, "membership loop task panicked");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
