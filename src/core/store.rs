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

//! Local Cache Store (§4.4): an ordered key→(value, timestamp) map bounded
//! by a character budget, evicting oldest-by-install-order entries to make
//! room, with last-writer-wins-by-timestamp on conflicting writes.
//!
//! Eviction order is tracked with a sequence-numbered queue rather than an
//! `indexmap`-style linked map: each successful install bumps a counter and
//! pushes `(seq, key)` to the back of a `VecDeque`. Popping the front during
//! eviction may turn up a stale entry for a key that has since been
//! reinstalled (and is therefore elsewhere in the queue, or no longer the
//! oldest) — such entries are recognized by a mismatched `seq` and skipped
//! rather than evicted.

use crate::core::types::{CacheEntry, Timestamp};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Store errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The entry alone (`|key| + |value|`) exceeds `MAX_SIZE`; no eviction
    /// could ever make room for it.
    #[error("entry too big for MAX_SIZE")]
    TooBig,
}

struct Stored {
    entry: CacheEntry,
    seq: u64,
}

/// The bounded, order-tracking key/value store.
pub struct Store {
    max_size: usize,
    entries: HashMap<String, Stored>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    total_chars: usize,
    evictions: u64,
}

impl Store {
    /// Create an empty store bounded by `max_size` characters.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            total_chars: 0,
            evictions: 0,
        }
    }

    /// `put(key, value, timestamp)` per §4.4:
    /// - empty `value` deletes the key (ok even if absent);
    /// - `|key| + |value| > MAX_SIZE` is rejected outright as `TooBig`;
    /// - otherwise the oldest entries are evicted until the write fits,
    ///   then the entry is installed at the newest position;
    /// - if an existing entry's timestamp is `>=` the incoming one, the
    ///   write is accepted (not an error) but the existing entry is kept.
    pub fn put(&mut self, key: &str, value: &str, timestamp: Timestamp) -> Result<(), StoreError> {
        if value.is_empty() {
            self.delete(key);
            return Ok(());
        }

        let new_cost = CacheEntry::cost(key, value);
        if new_cost > self.max_size {
            return Err(StoreError::TooBig);
        }

        if let Some(existing) = self.entries.get(key) {
            if existing.entry.timestamp >= timestamp {
                return Ok(());
            }
        }

        let existing_cost = self
            .entries
            .get(key)
            .map(|s| CacheEntry::cost(key, &s.entry.value))
            .unwrap_or(0);
        self.entries.remove(key);
        self.total_chars -= existing_cost;

        while self.total_chars + new_cost > self.max_size {
            if !self.evict_oldest() {
                break;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key.to_string(),
            Stored {
                entry: CacheEntry {
                    value: value.to_string(),
                    timestamp,
                },
                seq,
            },
        );
        self.order.push_back((seq, key.to_string()));
        self.total_chars += new_cost;
        Ok(())
    }

    /// `get(key)`: returns the stored `(value, timestamp)` on hit without
    /// touching eviction order, or `None` on a miss.
    pub fn get(&self, key: &str) -> Option<(&str, Timestamp)> {
        self.entries
            .get(key)
            .map(|s| (s.entry.value.as_str(), s.entry.timestamp))
    }

    /// Remove `key` unconditionally. A no-op if absent.
    pub fn delete(&mut self, key: &str) {
        if let Some(stored) = self.entries.remove(key) {
            self.total_chars -= CacheEntry::cost(key, &stored.entry.value);
        }
    }

    /// Current aggregate character count: `Σ(|key| + |value|)`.
    pub fn size(&self) -> usize {
        self.total_chars
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total evictions performed since creation (for metrics).
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Pop and evict the single oldest live entry, skipping any stale queue
    /// entries left behind by updates. Returns `false` if the queue (and
    /// therefore the store) is empty.
    fn evict_oldest(&mut self) -> bool {
        while let Some((seq, key)) = self.order.pop_front() {
            let is_live = matches!(self.entries.get(&key), Some(s) if s.seq == seq);
            if is_live {
                if let Some(stored) = self.entries.remove(&key) {
                    self.total_chars -= CacheEntry::cost(&key, &stored.entry.value);
                }
                self.evictions += 1;
                debug!(key = %key, "evicted");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::from_wire(s).unwrap()
    }

    #[test]
    fn set_then_get_idempotence() {
        let mut store = Store::new(1024);
        store.put("alpha", "one", ts("2026:01:01:00:00:00")).unwrap();
        assert_eq!(store.get("alpha"), Some(("one", ts("2026:01:01:00:00:00"))));
    }

    #[test]
    fn delete_via_empty_value() {
        let mut store = Store::new(1024);
        store.put("alpha", "one", ts("2026:01:01:00:00:00")).unwrap();
        store.put("alpha", "", ts("2026:01:01:00:00:01")).unwrap();
        assert_eq!(store.get("alpha"), None);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn delete_of_absent_key_is_ok() {
        let mut store = Store::new(1024);
        store.put("nope", "", ts("2026:01:01:00:00:00")).unwrap();
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn too_big_entry_rejected() {
        let mut store = Store::new(8);
        let err = store
            .put("key", "toolong!!", ts("2026:01:01:00:00:00"))
            .unwrap_err();
        assert_eq!(err, StoreError::TooBig);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn eviction_keeps_total_within_budget() {
        // MAX_SIZE=10, each entry costs 1+1=2 chars ("k0".."k9" keys are 2
        // chars each with 0-length... use single-char key/value = cost 2).
        let mut store = Store::new(10);
        for i in 0..10 {
            let k = format!("{i}");
            store.put(&k, "v", ts("2026:01:01:00:00:00")).unwrap();
            assert!(store.size() <= 10);
        }
        // 10 entries of cost 2 = 20 > 10, so evictions must have occurred.
        assert!(store.evictions() > 0);
        assert!(store.size() <= 10);
    }

    #[test]
    fn most_recent_entry_not_evicted_unless_alone_too_big() {
        let mut store = Store::new(4);
        store.put("a", "1", ts("2026:01:01:00:00:00")).unwrap(); // cost 2
        store.put("b", "1", ts("2026:01:01:00:00:01")).unwrap(); // cost 2, total 4
        store.put("c", "1", ts("2026:01:01:00:00:02")).unwrap(); // cost 2, evicts "a"
        assert_eq!(store.get("a"), None);
        assert!(store.get("c").is_some());
    }

    #[test]
    fn last_writer_wins_strictly_greater_timestamp_only() {
        let mut store = Store::new(1024);
        store.put("k", "old", ts("2026:01:01:00:00:05")).unwrap();
        // Equal timestamp: existing wins (tie favors existing).
        store.put("k", "same-ts", ts("2026:01:01:00:00:05")).unwrap();
        assert_eq!(store.get("k").unwrap().0, "old");
        // Earlier timestamp: existing wins.
        store.put("k", "older", ts("2026:01:01:00:00:01")).unwrap();
        assert_eq!(store.get("k").unwrap().0, "old");
        // Strictly later timestamp: incoming wins.
        store.put("k", "new", ts("2026:01:01:00:00:06")).unwrap();
        assert_eq!(store.get("k").unwrap().0, "new");
    }

    #[test]
    fn update_moves_key_to_newest_position() {
        let mut store = Store::new(6);
        store.put("a", "1", ts("2026:01:01:00:00:00")).unwrap(); // cost 2
        store.put("b", "1", ts("2026:01:01:00:00:01")).unwrap(); // cost 2, total 4
        // Re-write "a" with a later timestamp: it should move to the back of
        // the eviction order, so the next insert evicts "b" instead.
        store.put("a", "2", ts("2026:01:01:00:00:02")).unwrap(); // total 4
        store.put("c", "1", ts("2026:01:01:00:00:03")).unwrap(); // cost 2, total 6, no eviction needed yet
        store.put("d", "1", ts("2026:01:01:00:00:04")).unwrap(); // forces one eviction
        assert_eq!(store.get("b"), None);
        assert!(store.get("a").is_some());
    }
}
