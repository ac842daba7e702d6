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

//! meshcache - a distributed in-memory key/value cache over a dynamic
//! cluster of peer nodes, routed by consistent hashing.
//!
//! This repository provides:
//! - A Membership Registry with gossip-by-publication and expiry sweeping
//! - A multi-ring consistent-hashing index (configurable replicas/redundancy)
//! - A bounded, evicting Local Cache Store with last-writer-wins semantics
//! - A Peer Protocol Handler and an API Router fanning writes/reads out to
//!   owning peers within a deadline
//! - A concrete TCP transport, Prometheus metrics, and structured logging

/// Core protocol primitives (membership, ring, store, routing).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
/// Node wiring: binds sockets and drives the membership loop.
pub mod node;
/// Concrete TCP transport: envelope framing, listeners, pooled client.
pub mod transport;
