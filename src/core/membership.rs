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

//! Membership Registry (§4.1): the set of known peers, kept fresh by
//! incoming publications and the join handshake, and swept of anyone that
//! has gone quiet for too long.

use crate::core::types::{NodeDescriptor, NodeId, Timestamp};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// The set of known peers, including the local node itself.
pub struct Registry {
    self_id: NodeId,
    peers: HashMap<NodeId, NodeDescriptor>,
}

impl Registry {
    /// Create a registry seeded with the local node's own descriptor.
    pub fn new(local: NodeDescriptor) -> Self {
        let self_id = local.node_id.clone();
        let mut peers = HashMap::new();
        peers.insert(self_id.clone(), local);
        Self { self_id, peers }
    }

    /// The local node's id.
    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    /// Upsert a peer descriptor by `node_id`, refreshing `last_seen` to
    /// `now` (the time *this* node observed it, not the sender's own
    /// timestamp, per §3). Returns `true` if this changed the registry
    /// (new peer, or an address changed) — callers use this to decide
    /// whether the Ring Index needs to be rebuilt.
    pub fn observe(&mut self, mut descriptor: NodeDescriptor, now: Timestamp) -> bool {
        descriptor.last_seen = now;
        match self.peers.get_mut(&descriptor.node_id) {
            Some(existing) => {
                let addr_changed = existing.request_addr != descriptor.request_addr
                    || existing.publish_addr != descriptor.publish_addr;
                *existing = descriptor;
                if addr_changed {
                    info!(node_id = %existing.node_id, "peer re-addressed");
                }
                addr_changed
            }
            None => {
                info!(node_id = %descriptor.node_id, "peer observed");
                self.peers.insert(descriptor.node_id.clone(), descriptor);
                true
            }
        }
    }

    /// Remove every peer (except the local node) whose `last_seen` age
    /// exceeds `max_age`. Returns the removed node ids.
    pub fn sweep(&mut self, now: Timestamp, max_age: Duration) -> Vec<NodeId> {
        let mut expired = Vec::new();
        self.peers.retain(|id, desc| {
            if *id == self.self_id {
                return true;
            }
            let age = wall_age(desc.last_seen, now);
            let stale = age > max_age;
            if stale {
                expired.push(id.clone());
            }
            !stale
        });
        for id in &expired {
            debug!(node_id = %id, "peer expired");
        }
        expired
    }

    /// Refresh the local node's own `last_seen` to `now`.
    pub fn refresh_self(&mut self, now: Timestamp) {
        if let Some(me) = self.peers.get_mut(&self.self_id) {
            me.last_seen = now;
        }
    }

    /// Current view, including the local node, for publication or ring
    /// rebuilding.
    pub fn snapshot(&self) -> Vec<NodeDescriptor> {
        self.peers.values().cloned().collect()
    }

    /// Whether `node_id` is currently known (self included).
    pub fn is_known(&self, node_id: &str) -> bool {
        self.peers.contains_key(node_id)
    }

    /// Look up a peer's descriptor (self included).
    pub fn get(&self, node_id: &str) -> Option<&NodeDescriptor> {
        self.peers.get(node_id)
    }

    /// Number of known peers, including self.
    pub fn len(&self) -> usize {
        self.peers.len()
    }
}

fn wall_age(last_seen: Timestamp, now: Timestamp) -> Duration {
    now.duration_since(last_seen)
}
