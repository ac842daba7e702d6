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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container (SPEC_FULL.md §A.5).
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Known peers, including self.
    pub peers: IntGauge,
    /// Live entries in the local store.
    pub cache_entries: IntGauge,
    /// Aggregate character count in the local store.
    pub cache_size_chars: IntGauge,

    /// `set` requests served by the API router.
    pub sets_total: IntCounter,
    /// `get` requests served by the API router.
    pub gets_total: IntCounter,
    /// Entries evicted from the local store.
    pub evictions_total: IntCounter,
    /// Writes rejected as too big for `MAX_SIZE`.
    pub too_big_total: IntCounter,
    /// API requests that hit the deadline without a full set of replies.
    pub timeouts_total: IntCounter,
    /// Ring rebuilds triggered by membership changes.
    pub ring_rebuilds_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let peers = IntGauge::new("meshcache_peers", "Known peers, including self")
            .map_err(|_| MetricsError::Prom)?;
        let cache_entries = IntGauge::new("meshcache_cache_entries", "Live entries in the local store")
            .map_err(|_| MetricsError::Prom)?;
        let cache_size_chars = IntGauge::new(
            "meshcache_cache_size_chars",
            "Aggregate character count in the local store",
        )
        .map_err(|_| MetricsError::Prom)?;

        let sets_total = IntCounter::new("meshcache_sets_total", "set requests served")
            .map_err(|_| MetricsError::Prom)?;
        let gets_total = IntCounter::new("meshcache_gets_total", "get requests served")
            .map_err(|_| MetricsError::Prom)?;
        let evictions_total = IntCounter::new("meshcache_evictions_total", "Entries evicted")
            .map_err(|_| MetricsError::Prom)?;
        let too_big_total =
            IntCounter::new("meshcache_too_big_total", "Writes rejected as too big")
                .map_err(|_| MetricsError::Prom)?;
        let timeouts_total = IntCounter::new(
            "meshcache_timeouts_total",
            "API requests that hit the deadline without a full set of replies",
        )
        .map_err(|_| MetricsError::Prom)?;
        let ring_rebuilds_total = IntCounter::new(
            "meshcache_ring_rebuilds_total",
            "Ring rebuilds triggered by membership changes",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry.register(Box::new(peers.clone())).map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(cache_entries.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(cache_size_chars.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(sets_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(gets_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(evictions_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(too_big_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(timeouts_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(ring_rebuilds_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            peers,
            cache_entries,
            cache_size_chars,
            sets_total,
            gets_total,
            evictions_total,
            too_big_total,
            timeouts_total,
            ring_rebuilds_total,
        })
    }
}
