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

//! Ring Index (§4.3): `REDUNDANCY` independent consistent-hashing rings,
//! each with `REPLICAS` virtual positions per node, deriving a deterministic
//! owner tuple for any key.
//!
//! The ring is regenerated wholesale on every membership delta rather than
//! mutated in place (§3 invariant), so a `RingIndex` is an immutable
//! snapshot: build a new one and swap it in.

use crate::core::types::NodeId;
use sha2::{Digest, Sha256};

/// One ring's sorted virtual-position table.
#[derive(Debug)]
struct Ring {
    /// Sorted by `(position, node_id)`; position collisions are broken by
    /// the `node_id` the positions are tied back to at sort time (see
    /// `rebuild`), which already encodes the `(d, r, node_id)` tie-break.
    positions: Vec<(u64, NodeId)>,
}

impl Ring {
    fn owner(&self, key_pos: u64) -> Option<&NodeId> {
        if self.positions.is_empty() {
            return None;
        }
        let idx = self
            .positions
            .partition_point(|(pos, _)| *pos < key_pos);
        let idx = if idx == self.positions.len() { 0 } else { idx };
        Some(&self.positions[idx].1)
    }
}

/// A built, immutable set of `D` rings. Recompute via `rebuild` whenever the
/// peer set changes; routing consults the current instance.
#[derive(Debug)]
pub struct RingIndex {
    rings: Vec<Ring>,
}

/// Maps a byte string deterministically onto `[0, 2^64)`, standing in for
/// the `[0, 1)` unit interval of §4.3 (monotonic under division by 2^64, so
/// comparisons and binary search work the same as the floating-point
/// formulation without any precision loss).
fn hash_u64(data: &[u8]) -> u64 {
    let digest = Sha256::digest(data);
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest >= 8 bytes"))
}

fn node_position(node_id: &str, ring: usize, replica: usize) -> u64 {
    let mut buf = Vec::with_capacity(node_id.len() + 16);
    buf.extend_from_slice(node_id.as_bytes());
    buf.push(0);
    buf.extend_from_slice(ring.to_be_bytes().as_slice());
    buf.push(0);
    buf.extend_from_slice(replica.to_be_bytes().as_slice());
    hash_u64(&buf)
}

/// Position of a key on any ring (the hash function is shared across rings
/// and keys, per §4.3).
fn key_position(key: &str) -> u64 {
    hash_u64(key.as_bytes())
}

impl RingIndex {
    /// Build `redundancy` independent rings of `replicas` virtual positions
    /// per peer, from the given peer set. Deterministic: the same peer set,
    /// `replicas`, and `redundancy` always produce byte-identical rings
    /// (§8 property 7), which is what lets every node in the cluster compute
    /// the same owner set for the same key (§8 property 2).
    pub fn rebuild(peer_ids: &[NodeId], replicas: u32, redundancy: u32) -> Self {
        let mut rings = Vec::with_capacity(redundancy as usize);
        for d in 0..redundancy as usize {
            let mut entries: Vec<(u64, usize, NodeId)> = Vec::with_capacity(
                peer_ids.len() * replicas as usize,
            );
            for r in 0..replicas as usize {
                for node_id in peer_ids {
                    let pos = node_position(node_id, d, r);
                    entries.push((pos, r, node_id.clone()));
                }
            }
            // Collisions break deterministically by lexicographic (d, r,
            // node_id); `d` is constant within this ring so (r, node_id) is
            // the remaining tie-break.
            entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
            let positions = entries.into_iter().map(|(pos, _, id)| (pos, id)).collect();
            rings.push(Ring { positions });
        }
        Self { rings }
    }

    /// The `D`-tuple of owner node ids for `key`, deduplicated while
    /// preserving first-seen order (§3, §4.3). Empty if the index was built
    /// from an empty peer set.
    pub fn owners(&self, key: &str) -> Vec<NodeId> {
        let key_pos = key_position(key);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(self.rings.len());
        for ring in &self.rings {
            if let Some(owner) = ring.owner(key_pos) {
                if seen.insert(owner.clone()) {
                    out.push(owner.clone());
                }
            }
        }
        out
    }
}
