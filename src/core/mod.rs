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
#![allow(missing_docs)]

//! Core protocol primitives: membership, the consistent-hashing ring, the
//! bounded cache store, the peer protocol handler, and the API router.
//! Ties into one shared, mutex-guarded state (§5): recomputing the ring and
//! mutating the store are synchronous critical sections, never held across
//! an `.await`.

pub mod api_router;
pub mod config;
pub mod membership;
pub mod peer_protocol;
pub mod ring;
pub mod shared;
pub mod store;
pub mod types;

pub use shared::SharedCore;
