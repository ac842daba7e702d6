// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Node wiring: binds the peer request socket, the API socket, and the
//! publish socket, then drives the membership loop (§4.2) — periodic
//! publication, per-peer subscription management, and expiry sweeping —
//! the way the teacher's `networking::p2p::spawn_p2p` drives its swarm loop
//! from a single `tokio::spawn`'d task multiplexed with `tokio::select!`.

use crate::core::types::{NodeDescriptor, Timestamp, PROTOCOL_VERSION};
use crate::core::{api_router, peer_protocol, SharedCore};
use crate::monitoring::metrics::Metrics;
use crate::transport::tcp::{self, Handler, PeerClientPool, PublishServer};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Handles for the tasks a running node spawns. Dropping these does not
/// stop the tasks; hold them for the life of the process and `.await` (or
/// abort) on shutdown.
pub struct NodeHandles {
    /// Serves the peer request socket.
    pub request_listener: JoinHandle<()>,
    /// Serves the client-facing API socket.
    pub api_listener: JoinHandle<()>,
    /// Drives publication, subscription, and expiry sweeping.
    pub membership_loop: JoinHandle<()>,
}

/// Bind all three sockets and start the membership loop for `core`.
pub async fn spawn_node(
    core: Arc<SharedCore>,
    dispatch: Arc<PeerClientPool>,
    metrics: Arc<Metrics>,
    api_addr: &str,
    request_addr: &str,
    publish_addr: &str,
) -> io::Result<NodeHandles> {
    let peer_core = core.clone();
    let peer_handler: Handler = Arc::new(move |payload| -> BoxFuture<'static, Vec<String>> {
        let core = peer_core.clone();
        Box::pin(async move { peer_protocol::handle(&core, &payload) })
    });
    let request_listener = tcp::spawn_request_listener(request_addr, peer_handler).await?;

    let api_core = core.clone();
    let api_dispatch = dispatch.clone();
    let api_metrics = metrics.clone();
    let api_handler: Handler = Arc::new(move |payload| -> BoxFuture<'static, Vec<String>> {
        let core = api_core.clone();
        let dispatch = api_dispatch.clone();
        let metrics = api_metrics.clone();
        Box::pin(async move {
            let verb = payload.get(1).cloned();
            let reply = api_router::handle(&core, dispatch.as_ref(), &payload).await;
            match verb.as_deref() {
                Some("set") => {
                    metrics.sets_total.inc();
                    match reply.first().map(String::as_str) {
                        Some("1") => metrics.too_big_total.inc(),
                        Some("2") => metrics.timeouts_total.inc(),
                        _ => {}
                    }
                }
                Some("get") => metrics.gets_total.inc(),
                _ => {}
            }
            reply
        })
    });
    let api_listener = tcp::spawn_request_listener(api_addr, api_handler).await?;

    let publish_server = Arc::new(PublishServer::bind(publish_addr).await?);
    let membership_core = core.clone();
    let membership_metrics = metrics;
    let membership_loop =
        tokio::spawn(run_membership_loop(membership_core, publish_server, membership_metrics));

    info!(%api_addr, %request_addr, %publish_addr, "node listening");

    Ok(NodeHandles { request_listener, api_listener, membership_loop })
}

async fn run_membership_loop(core: Arc<SharedCore>, publish_server: Arc<PublishServer>, metrics: Arc<Metrics>) {
    let mut publish_ticker = tokio::time::interval(core.config.publish_interval);
    let mut sweep_ticker = tokio::time::interval(core.config.publish_interval);
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut last_evictions = core.store_evictions();
    let mut last_ring_rebuilds = core.ring_rebuilds();

    loop {
        tokio::select! {
            _ = publish_ticker.tick() => {
                let now = Timestamp::now();
                core.refresh_self(now);
                let snapshot = core.registry_snapshot();

                publish_server.broadcast(&tcp::encode_snapshot(&snapshot)).await;

                for descriptor in &snapshot {
                    if descriptor.node_id == core.self_descriptor.node_id {
                        continue;
                    }
                    subscriptions.entry(descriptor.node_id.clone()).or_insert_with(|| {
                        let core = core.clone();
                        let node_id = descriptor.node_id.clone();
                        let publish_addr = descriptor.publish_addr.clone();
                        tokio::spawn(run_subscription(core, node_id, publish_addr))
                    });
                }

                let known: std::collections::HashSet<&str> =
                    snapshot.iter().map(|d| d.node_id.as_str()).collect();
                subscriptions.retain(|node_id, handle| {
                    if known.contains(node_id.as_str()) {
                        true
                    } else {
                        handle.abort();
                        false
                    }
                });

                metrics.peers.set(core.peer_count() as i64);
                metrics.cache_entries.set(core.store_len() as i64);
                metrics.cache_size_chars.set(core.store_size() as i64);

                let evictions = core.store_evictions();
                metrics.evictions_total.inc_by(evictions.saturating_sub(last_evictions));
                last_evictions = evictions;

                let ring_rebuilds = core.ring_rebuilds();
                metrics.ring_rebuilds_total.inc_by(ring_rebuilds.saturating_sub(last_ring_rebuilds));
                last_ring_rebuilds = ring_rebuilds;
            }
            _ = sweep_ticker.tick() => {
                let now = Timestamp::now();
                let removed = core.sweep_peers(now, core.config.peer_expiry);
                for node_id in removed {
                    info!(%node_id, "peer expired");
                }
            }
        }
    }
}

/// Keep a subscription to one peer's publish address alive, merging every
/// descriptor it publishes other than the local node's own. Reconnects on
/// failure; exits once the peer is no longer in the registry (it was swept
/// or never came back, so the membership loop already stopped tracking it).
async fn run_subscription(core: Arc<SharedCore>, node_id: String, publish_addr: String) {
    loop {
        if !core.is_known(&node_id) {
            return;
        }
        match tcp::subscribe(&publish_addr).await {
            Ok(mut stream) => loop {
                match tcp::read_publication(&mut stream).await {
                    Ok(payload) => {
                        let now = Timestamp::now();
                        for descriptor in tcp::decode_snapshot(&payload) {
                            if descriptor.node_id != core.self_descriptor.node_id {
                                core.observe_peer(descriptor, now);
                            }
                        }
                    }
                    Err(_) => break,
                }
            },
            Err(e) => {
                warn!(%node_id, error = %e, "subscription dial failed; retrying");
            }
        }
        tokio::time::sleep(core.config.publish_interval).await;
    }
}

/// Errors joining an existing cluster via the bootstrap handshake (§4.7).
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Could not reach `peer_request_addr` at all.
    #[error("connect to {0} failed: {1}")]
    Dispatch(String, io::Error),
    /// The responder already has a peer registered under our node id.
    #[error("node-id {0} already taken in this cluster")]
    NodeIdTaken(String),
    /// The success reply didn't carry the expected six fields.
    #[error("malformed connect reply from {0}")]
    MalformedReply(String),
    /// SPEC_FULL.md §B.3: the responder's REPLICAS/REDUNDANCY don't match ours.
    #[error(
        "cluster parameter mismatch with {addr}: peer has REPLICAS={peer_replicas} \
         REDUNDANCY={peer_redundancy}, this node has REPLICAS={self_replicas} \
         REDUNDANCY={self_redundancy}"
    )]
    ClusterMismatch {
        /// The peer we attempted to join through.
        addr: String,
        /// The peer's configured REPLICAS.
        peer_replicas: u32,
        /// The peer's configured REDUNDANCY.
        peer_redundancy: u32,
        /// This node's configured REPLICAS.
        self_replicas: u32,
        /// This node's configured REDUNDANCY.
        self_redundancy: u32,
    },
    /// Any other non-OK status.
    #[error("bootstrap connect to {0} rejected with status {1:?}")]
    Rejected(String, Option<String>),
}

/// Send the bootstrap `connect` handshake (§4.7): on success, merge the
/// responder into the registry and validate its cluster parameters match
/// ours (SPEC_FULL.md §B.3) before returning; on `node-id-taken` or a
/// parameter mismatch, the caller should treat this as fatal and exit.
pub async fn bootstrap(
    core: &SharedCore,
    dispatch: &PeerClientPool,
    peer_request_addr: &str,
) -> Result<(), BootstrapError> {
    let payload = vec![
        PROTOCOL_VERSION.to_string(),
        "connect".to_string(),
        core.self_descriptor.node_id.clone(),
        core.self_descriptor.request_addr.clone(),
        core.self_descriptor.publish_addr.clone(),
    ];
    let reply = dispatch
        .send_request(peer_request_addr, payload)
        .await
        .map_err(|e| BootstrapError::Dispatch(peer_request_addr.to_string(), e))?;

    match reply.first().map(String::as_str) {
        Some("0") => {
            let [_, peer_id, peer_request, peer_publish, replicas, redundancy] = reply.as_slice()
            else {
                return Err(BootstrapError::MalformedReply(peer_request_addr.to_string()));
            };
            let peer_replicas: u32 = replicas.parse().unwrap_or(0);
            let peer_redundancy: u32 = redundancy.parse().unwrap_or(0);
            if peer_replicas != core.cluster.replicas || peer_redundancy != core.cluster.redundancy {
                return Err(BootstrapError::ClusterMismatch {
                    addr: peer_request_addr.to_string(),
                    peer_replicas,
                    peer_redundancy,
                    self_replicas: core.cluster.replicas,
                    self_redundancy: core.cluster.redundancy,
                });
            }
            core.observe_peer(
                NodeDescriptor {
                    node_id: peer_id.clone(),
                    request_addr: peer_request.clone(),
                    publish_addr: peer_publish.clone(),
                    last_seen: Timestamp::now(),
                },
                Timestamp::now(),
            );
            info!(peer = %peer_id, "joined cluster");
            Ok(())
        }
        Some("997") => Err(BootstrapError::NodeIdTaken(core.self_descriptor.node_id.clone())),
        other => Err(BootstrapError::Rejected(peer_request_addr.to_string(), other.map(String::from))),
    }
}
