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

//! The single mutex-guarded bundle of Membership Registry, Ring Index, and
//! Local Cache Store (§5): "the external contracts do not change" whether
//! this runs on one thread or many, as long as these three share one lock
//! (or a deterministic shard of it). Ring recomputation and store mutation
//! are synchronous and never span an `.await`.

use crate::core::config::{ClusterParams, NodeConfig};
use crate::core::membership::Registry;
use crate::core::ring::RingIndex;
use crate::core::store::{Store, StoreError};
use crate::core::types::{NodeDescriptor, NodeId, Timestamp};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

struct Inner {
    registry: Registry,
    ring: RingIndex,
    store: Store,
    ring_rebuilds: u64,
}

/// Shared node state: one lock, three cooperating components (§4, §5).
pub struct SharedCore {
    /// This node's own descriptor (addresses are fixed for the process
    /// lifetime; only `last_seen` in the registry copy changes).
    pub self_descriptor: NodeDescriptor,
    /// Ring parameters, fixed for the process lifetime.
    pub cluster: ClusterParams,
    /// The remaining configuration knobs.
    pub config: NodeConfig,
    inner: Mutex<Inner>,
}

impl SharedCore {
    /// Build a fresh core for a node that knows only about itself.
    pub fn new(self_descriptor: NodeDescriptor, config: NodeConfig) -> Self {
        let registry = Registry::new(self_descriptor.clone());
        let ring = RingIndex::rebuild(
            &[self_descriptor.node_id.clone()],
            config.cluster.replicas,
            config.cluster.redundancy,
        );
        let store = Store::new(config.max_size);
        Self {
            self_descriptor,
            cluster: config.cluster,
            config,
            inner: Mutex::new(Inner {
                registry,
                ring,
                store,
                ring_rebuilds: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Rebuild the ring from the current registry snapshot. Called whenever
    /// `observe`/`sweep` report a change.
    fn rebuild_ring_locked(&self, inner: &mut Inner) {
        let mut ids: Vec<NodeId> = inner.registry.snapshot().into_iter().map(|d| d.node_id).collect();
        ids.sort();
        inner.ring = RingIndex::rebuild(&ids, self.cluster.replicas, self.cluster.redundancy);
        inner.ring_rebuilds += 1;
        info!(peers = ids.len(), "ring rebuilt");
    }

    /// Merge an observed peer descriptor (§4.1, §4.2). Rebuilds the ring if
    /// this changed membership.
    pub fn observe_peer(&self, descriptor: NodeDescriptor, now: Timestamp) {
        let mut inner = self.lock();
        let changed = inner.registry.observe(descriptor, now);
        if changed {
            self.rebuild_ring_locked(&mut inner);
        }
    }

    /// Sweep peers that have gone stale (§4.1). Rebuilds the ring if
    /// anything was removed.
    pub fn sweep_peers(&self, now: Timestamp, max_age: Duration) -> Vec<NodeId> {
        let mut inner = self.lock();
        let expired = inner.registry.sweep(now, max_age);
        if !expired.is_empty() {
            self.rebuild_ring_locked(&mut inner);
        }
        expired
    }

    /// Refresh this node's own `last_seen` ahead of a publication.
    pub fn refresh_self(&self, now: Timestamp) {
        self.lock().registry.refresh_self(now);
    }

    /// Current registry view, for publication.
    pub fn registry_snapshot(&self) -> Vec<NodeDescriptor> {
        self.lock().registry.snapshot()
    }

    /// Whether `node_id` is a known peer (including self).
    pub fn is_known(&self, node_id: &str) -> bool {
        self.lock().registry.is_known(node_id)
    }

    /// A known peer's descriptor.
    pub fn peer(&self, node_id: &str) -> Option<NodeDescriptor> {
        self.lock().registry.get(node_id).cloned()
    }

    /// Owner tuple for `key`, deduplicated (§4.3).
    pub fn owners(&self, key: &str) -> Vec<NodeId> {
        self.lock().ring.owners(key)
    }

    /// `put` into the local store (§4.4).
    pub fn store_put(&self, key: &str, value: &str, timestamp: Timestamp) -> Result<(), StoreError> {
        self.lock().store.put(key, value, timestamp)
    }

    /// `get` from the local store (§4.4).
    pub fn store_get(&self, key: &str) -> Option<(String, Timestamp)> {
        self.lock()
            .store
            .get(key)
            .map(|(v, ts)| (v.to_string(), ts))
    }

    /// Current store size in characters, for metrics.
    pub fn store_size(&self) -> usize {
        self.lock().store.size()
    }

    /// Total evictions performed so far, for metrics.
    pub fn store_evictions(&self) -> u64 {
        self.lock().store.evictions()
    }

    /// Number of known peers including self, for metrics.
    pub fn peer_count(&self) -> usize {
        self.lock().registry.len()
    }

    /// Live entries in the local store, for metrics.
    pub fn store_len(&self) -> usize {
        self.lock().store.len()
    }

    /// Total ring rebuilds performed so far, for metrics.
    pub fn ring_rebuilds(&self) -> u64 {
        self.lock().ring_rebuilds
    }
}
