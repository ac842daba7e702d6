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

//! Peer Protocol Handler (§4.5): serves inbound `set`/`get`/`connect` from
//! other nodes over the request socket. Malformed requests (wrong arity,
//! an unparsable `TIMESTAMP`) are treated the same as an unrecognized verb
//! — `unknown-request` — since §4.5 doesn't otherwise distinguish a
//! malformed request from one this build doesn't understand.

use crate::core::shared::SharedCore;
use crate::core::store::StoreError;
use crate::core::types::{NodeDescriptor, Timestamp, MISS_TIMESTAMP_LITERAL, PROTOCOL_VERSION};
use tracing::warn;

const OK: &str = "0";
const TOO_BIG: &str = "1";
const NODE_ID_TAKEN: &str = "997";
const UNKNOWN_REQUEST: &str = "998";
const VERSION_NOT_SUPPORTED: &str = "999";

/// Handle one decoded peer-protocol request, returning the reply payload
/// frames (§6's peer request table, extended per SPEC_FULL.md §B.3 on a
/// successful `connect`).
pub fn handle(core: &SharedCore, payload: &[String]) -> Vec<String> {
    let Some(version) = payload.first() else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    if version != PROTOCOL_VERSION {
        return vec![VERSION_NOT_SUPPORTED.to_string()];
    }
    match payload.get(1).map(String::as_str) {
        Some("set") => handle_set(core, &payload[2..]),
        Some("get") => handle_get(core, &payload[2..]),
        Some("connect") => handle_connect(core, &payload[2..]),
        _ => vec![UNKNOWN_REQUEST.to_string()],
    }
}

fn handle_set(core: &SharedCore, args: &[String]) -> Vec<String> {
    let [key, value, timestamp] = args else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    let Ok(timestamp) = Timestamp::from_wire(timestamp) else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    match core.store_put(key, value, timestamp) {
        Ok(()) => vec![OK.to_string()],
        Err(StoreError::TooBig) => vec![TOO_BIG.to_string()],
    }
}

fn handle_get(core: &SharedCore, args: &[String]) -> Vec<String> {
    let [key] = args else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    match core.store_get(key) {
        Some((value, timestamp)) => vec![OK.to_string(), value, timestamp.to_wire()],
        None => vec![OK.to_string(), String::new(), MISS_TIMESTAMP_LITERAL.to_string()],
    }
}

fn handle_connect(core: &SharedCore, args: &[String]) -> Vec<String> {
    let [node_id, request_addr, publish_addr] = args else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    if node_id == core.self_descriptor.node_id || core.is_known(node_id) {
        warn!(%node_id, "rejecting connect: node-id already taken");
        return vec![NODE_ID_TAKEN.to_string()];
    }
    let descriptor = NodeDescriptor {
        node_id: node_id.clone(),
        request_addr: request_addr.clone(),
        publish_addr: publish_addr.clone(),
        last_seen: Timestamp::now(),
    };
    core.observe_peer(descriptor, Timestamp::now());
    vec![
        OK.to_string(),
        core.self_descriptor.node_id.clone(),
        core.self_descriptor.request_addr.clone(),
        core.self_descriptor.publish_addr.clone(),
        core.cluster.replicas.to_string(),
        core.cluster.redundancy.to_string(),
    ]
}
