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

//! API Router (§4.6): the client-facing entry point. Consults the Ring
//! Index for the owner tuple, fans a write out to every owner (self routed
//! in-process, peers over `PeerDispatch`), races a read across owners, and
//! aggregates within a single per-request deadline.
//!
//! Outcome precedence on `set` (an implementation decision — §4.6 step 5
//! lists these as independent bullets without stating relative priority
//! when more than one applies at once; see `DESIGN.md`):
//! `no-error` (every owner OK) > `too-big` (any owner rejected it outright)
//! > `timeout` (any owner unreachable or didn't answer in time) >
//! `unknown-request` (an owner replied with an explicit protocol error).

use crate::core::shared::SharedCore;
use crate::core::store::StoreError;
use crate::core::types::{Timestamp, MISS_TIMESTAMP_LITERAL, PROTOCOL_VERSION};
use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tracing::warn;

const OK: &str = "0";
const TOO_BIG: &str = "1";
const TIMEOUT: &str = "2";
const UNKNOWN_REQUEST: &str = "998";
const VERSION_NOT_SUPPORTED: &str = "999";

/// A peer's reply to a dispatched `set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerSetOutcome {
    /// `"0"`.
    Ok,
    /// `"1"`.
    TooBig,
    /// `"998"` or `"999"` — a protocol-level error from a peer.
    ProtocolError,
}

/// A peer's reply to a dispatched `get`: the value (empty = miss) and the
/// timestamp it was stored with.
#[derive(Clone, Debug)]
pub struct PeerGetReply {
    /// Empty string means miss.
    pub value: String,
    /// `0` (via `MISS_TIMESTAMP_LITERAL`) on miss.
    pub timestamp: String,
}

/// Failure dispatching to a peer: connection refused, write failed, peer
/// never replied. Collapsed to one variant because the Router treats all
/// of these identically — a silently missing reply (§7).
#[derive(Debug)]
pub struct DispatchError;

/// Outbound dispatch to peer nodes over the request socket. Implemented by
/// the concrete transport (`transport::tcp::PeerClientPool`); kept as a
/// trait so `core` has no dependency on the wire/transport layer.
#[async_trait]
pub trait PeerDispatch: Send + Sync {
    /// Dispatch `set KEY VALUE TIMESTAMP` to the peer at `request_addr`.
    async fn send_set(
        &self,
        request_addr: &str,
        key: &str,
        value: &str,
        timestamp: Timestamp,
    ) -> Result<PeerSetOutcome, DispatchError>;

    /// Dispatch `get KEY` to the peer at `request_addr`.
    async fn send_get(&self, request_addr: &str, key: &str) -> Result<PeerGetReply, DispatchError>;
}

/// Handle one decoded API-protocol request (§6's API protocol table),
/// returning the reply payload frames.
pub async fn handle(
    core: &SharedCore,
    dispatch: &dyn PeerDispatch,
    payload: &[String],
) -> Vec<String> {
    let Some(version) = payload.first() else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };
    if version != PROTOCOL_VERSION {
        return vec![VERSION_NOT_SUPPORTED.to_string()];
    }
    match payload.get(1).map(String::as_str) {
        Some("set") => handle_set(core, dispatch, &payload[2..]).await,
        Some("get") => handle_get(core, dispatch, &payload[2..]).await,
        _ => vec![UNKNOWN_REQUEST.to_string()],
    }
}

async fn handle_set(core: &SharedCore, dispatch: &dyn PeerDispatch, args: &[String]) -> Vec<String> {
    let [key, value] = args else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };

    if crate::core::types::CacheEntry::cost(key, value) > core.config.max_size {
        return vec![TOO_BIG.to_string()];
    }

    let timestamp = Timestamp::now();
    let owners = core.owners(key);
    if owners.is_empty() {
        // No peers known at all, not even self — can't happen in practice
        // (the local node is always in its own registry) but stay correct.
        return vec![TIMEOUT.to_string()];
    }

    let mut futs = FuturesUnordered::new();
    for owner in owners {
        if owner == core.self_descriptor.node_id {
            let result = match core.store_put(key, value, timestamp) {
                Ok(()) => PeerSetOutcome::Ok,
                Err(StoreError::TooBig) => PeerSetOutcome::TooBig,
            };
            futs.push(Box::pin(async move { Ok(result) })
                as std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerSetOutcome, DispatchError>> + Send>>);
        } else {
            let Some(peer) = core.peer(&owner) else {
                futs.push(Box::pin(async move { Err(DispatchError) })
                    as std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerSetOutcome, DispatchError>> + Send>>);
                continue;
            };
            let key = key.clone();
            let value = value.clone();
            futs.push(Box::pin(async move {
                dispatch.send_set(&peer.request_addr, &key, &value, timestamp).await
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerSetOutcome, DispatchError>> + Send>>);
        }
    }

    let results = match tokio::time::timeout(core.config.request_deadline, collect_all(&mut futs)).await {
        Ok(results) => results,
        Err(_) => {
            warn!(%key, "set fan-out deadline elapsed");
            return vec![TIMEOUT.to_string()];
        }
    };

    if results.iter().all(|r| matches!(r, Ok(PeerSetOutcome::Ok))) {
        vec![OK.to_string()]
    } else if results.iter().any(|r| matches!(r, Ok(PeerSetOutcome::TooBig))) {
        vec![TOO_BIG.to_string()]
    } else if results.iter().any(|r| r.is_err()) {
        vec![TIMEOUT.to_string()]
    } else {
        vec![UNKNOWN_REQUEST.to_string()]
    }
}

async fn handle_get(core: &SharedCore, dispatch: &dyn PeerDispatch, args: &[String]) -> Vec<String> {
    let [key] = args else {
        return vec![UNKNOWN_REQUEST.to_string()];
    };

    let owners = core.owners(key);
    let deadline = core.config.request_deadline;

    let race = async {
        let mut futs = FuturesUnordered::new();
        for owner in owners {
            if owner == core.self_descriptor.node_id {
                let local = core.store_get(key).map(|(v, ts)| PeerGetReply {
                    value: v,
                    timestamp: ts.to_wire(),
                });
                futs.push(Box::pin(async move {
                    Ok(local.unwrap_or(PeerGetReply {
                        value: String::new(),
                        timestamp: MISS_TIMESTAMP_LITERAL.to_string(),
                    }))
                }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerGetReply, DispatchError>> + Send>>);
            } else if let Some(peer) = core.peer(&owner) {
                let key = key.clone();
                futs.push(Box::pin(async move { dispatch.send_get(&peer.request_addr, &key).await })
                    as std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerGetReply, DispatchError>> + Send>>);
            }
        }
        while let Some(result) = futs.next().await {
            if let Ok(reply) = result {
                if !reply.value.is_empty() {
                    return Some(reply.value);
                }
            }
        }
        None
    };

    match tokio::time::timeout(deadline, race).await {
        Ok(Some(value)) => vec![OK.to_string(), value],
        // All owners answered with a miss, or the deadline elapsed first:
        // both surface as a plain miss (§4.6 step 5; timeout is not
        // distinguished from miss on `get`).
        Ok(None) | Err(_) => vec![OK.to_string(), String::new()],
    }
}

async fn collect_all<T>(
    futs: &mut FuturesUnordered<std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>>,
) -> Vec<T> {
    let mut out = Vec::new();
    while let Some(item) = futs.next().await {
        out.push(item);
    }
    out
}
