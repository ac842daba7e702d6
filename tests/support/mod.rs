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

//! Shared scaffolding for the scenario tests (§8): spins up real nodes over
//! loopback TCP and drives them with the same wire protocol a client would
//! use, rather than calling into `core` directly.

use std::sync::Arc;
use std::time::Duration;

use meshcache::core::config::NodeConfig;
use meshcache::core::types::{NodeDescriptor, Timestamp, PROTOCOL_VERSION};
use meshcache::core::SharedCore;
use meshcache::monitoring::metrics::Metrics;
use meshcache::node::{self, NodeHandles};
use meshcache::transport::tcp::PeerClientPool;

/// A config tuned for fast, deterministic tests: short publish/expiry
/// windows so gossip convergence doesn't make the suite slow, while still
/// respecting the `peer_expiry >= 3x publish_interval` invariant (§4.1).
pub fn fast_config() -> NodeConfig {
    let mut cfg = NodeConfig::default();
    cfg.publish_interval = Duration::from_millis(60);
    cfg.peer_expiry = Duration::from_millis(400);
    cfg
}

/// A running node plus the handles needed to talk to it and keep its tasks
/// alive for the duration of a test.
pub struct RunningNode {
    pub core: Arc<SharedCore>,
    pub client: Arc<PeerClientPool>,
    pub api_addr: String,
    pub request_addr: String,
    #[allow(dead_code)]
    handles: NodeHandles,
}

/// Bind and start a node on loopback at the given ports, waiting briefly for
/// its listeners to come up before returning.
pub async fn start_node(
    node_id: &str,
    api_port: u16,
    request_port: u16,
    publish_port: u16,
    config: NodeConfig,
) -> RunningNode {
    let api_addr = format!("127.0.0.1:{api_port}");
    let request_addr = format!("127.0.0.1:{request_port}");
    let publish_addr = format!("127.0.0.1:{publish_port}");

    let descriptor = NodeDescriptor {
        node_id: node_id.to_string(),
        request_addr: request_addr.clone(),
        publish_addr: publish_addr.clone(),
        last_seen: Timestamp::now(),
    };
    let core = Arc::new(SharedCore::new(descriptor, config));
    let client = Arc::new(PeerClientPool::new());
    let metrics = Arc::new(Metrics::new().expect("metrics registration"));

    let handles = node::spawn_node(core.clone(), client.clone(), metrics, &api_addr, &request_addr, &publish_addr)
        .await
        .expect("node should bind its sockets");

    tokio::time::sleep(Duration::from_millis(40)).await;

    RunningNode { core, client, api_addr, request_addr, handles }
}

/// Send an API `set KEY VALUE` and return the reply frames.
pub async fn api_set(client: &PeerClientPool, api_addr: &str, key: &str, value: &str) -> Vec<String> {
    client
        .send_request(
            api_addr,
            vec![PROTOCOL_VERSION.to_string(), "set".to_string(), key.to_string(), value.to_string()],
        )
        .await
        .expect("set request should round-trip")
}

/// Send an API `get KEY` and return the reply frames.
pub async fn api_get(client: &PeerClientPool, api_addr: &str, key: &str) -> Vec<String> {
    client
        .send_request(api_addr, vec![PROTOCOL_VERSION.to_string(), "get".to_string(), key.to_string()])
        .await
        .expect("get request should round-trip")
}

/// Find a key whose current owner tuple (under `core`'s ring) includes every
/// id in `want`. Ring placement is a hash function, not something a test can
/// predict in advance, so this just tries candidates until one matches.
pub fn find_key_owned_by(core: &SharedCore, want: &[&str]) -> String {
    for i in 0..5000u32 {
        let key = format!("probe-{i}");
        let owners = core.owners(&key);
        if want.iter().all(|id| owners.iter().any(|o| o == id)) {
            return key;
        }
    }
    panic!("no probe key found whose owners cover {want:?}");
}
