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

//! TCP realization of the transport (§B.1): each frame is a `u32` byte
//! length followed by its UTF-8 bytes, and each envelope on the wire is a
//! `u32` frame count followed by that many frames. The peer request socket
//! and the API socket both run the same request/reply listener,
//! parameterized by whichever handler decodes and answers the payload. The
//! publish socket is a fan-out broadcaster. Outbound dispatch to peers goes
//! through a small pool that lazily (re)connects per destination address.

use crate::core::api_router::{DispatchError, PeerDispatch, PeerGetReply, PeerSetOutcome};
use crate::core::types::{NodeDescriptor, Timestamp, MISS_TIMESTAMP_LITERAL, PROTOCOL_VERSION};
use crate::transport::envelope::Envelope;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Topic byte prefixing a published membership snapshot (§4.2).
pub const PUBLISH_TOPIC: &str = "n";

async fn read_frames(stream: &mut TcpStream) -> io::Result<Vec<String>> {
    let count = stream.read_u32().await?;
    let mut frames = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = stream.read_u32().await?;
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await?;
        let frame = String::from_utf8(buf)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-utf8 frame"))?;
        frames.push(frame);
    }
    Ok(frames)
}

async fn write_frames(stream: &mut TcpStream, frames: &[String]) -> io::Result<()> {
    stream.write_u32(frames.len() as u32).await?;
    for frame in frames {
        let bytes = frame.as_bytes();
        stream.write_u32(bytes.len() as u32).await?;
        stream.write_all(bytes).await?;
    }
    stream.flush().await
}

/// A handler decoding one request payload into a reply payload.
pub type Handler = Arc<dyn Fn(Vec<String>) -> BoxFuture<'static, Vec<String>> + Send + Sync>;

/// Bind `addr` and serve request/reply envelopes with `handler` forever,
/// one task per accepted connection. Used for both the peer request socket
/// and the API socket (§B.1) — the handler is the only thing that differs.
pub async fn spawn_request_listener(addr: &str, handler: Handler) -> io::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr).await?;
    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler).await {
                            debug!(%peer_addr, error = %e, "request connection closed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed on request listener"),
            }
        }
    }))
}

async fn serve_connection(mut stream: TcpStream, handler: Handler) -> io::Result<()> {
    loop {
        let frames = match read_frames(&mut stream).await {
            Ok(frames) => frames,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        let Some(envelope) = Envelope::from_frames(frames) else {
            debug!("dropping malformed envelope");
            continue;
        };
        let reply_payload = handler(envelope.payload).await;
        let reply = envelope.reply(reply_payload);
        write_frames(&mut stream, &reply.to_frames()).await?;
    }
}

/// The publish socket (§4.2): accepts subscriber connections and broadcasts
/// the current membership snapshot to all of them on each tick, pruning any
/// connection whose write fails.
pub struct PublishServer {
    subscribers: Arc<Mutex<Vec<TcpStream>>>,
}

impl PublishServer {
    /// Bind the publish socket and start accepting subscriber connections.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let subscribers: Arc<Mutex<Vec<TcpStream>>> = Arc::new(Mutex::new(Vec::new()));
        let accepted = subscribers.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        debug!(%peer_addr, "publish subscriber connected");
                        accepted.lock().await.push(stream);
                    }
                    Err(e) => warn!(error = %e, "accept failed on publish listener"),
                }
            }
        });
        Ok(Self { subscribers })
    }

    /// Write `payload` to every connected subscriber, dropping any whose
    /// write fails.
    pub async fn broadcast(&self, payload: &[String]) {
        let frames = Envelope::new(payload.to_vec()).to_frames();
        let mut subs = self.subscribers.lock().await;
        let mut alive = Vec::with_capacity(subs.len());
        for mut stream in subs.drain(..) {
            if write_frames(&mut stream, &frames).await.is_ok() {
                alive.push(stream);
            }
        }
        *subs = alive;
    }
}

/// Dial a peer's publish address and read one published envelope's payload.
/// Callers loop this to keep a subscription alive (§4.2b).
pub async fn subscribe(addr: &str) -> io::Result<TcpStream> {
    TcpStream::connect(addr).await
}

/// Read the next publication frame from an already-connected subscription.
pub async fn read_publication(stream: &mut TcpStream) -> io::Result<Vec<String>> {
    let frames = read_frames(stream).await?;
    Envelope::from_frames(frames)
        .map(|e| e.payload)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed publication envelope"))
}

/// Encode a membership snapshot as a publish payload: the topic byte
/// followed by four frames per descriptor (§4.2).
pub fn encode_snapshot(descriptors: &[NodeDescriptor]) -> Vec<String> {
    let mut payload = Vec::with_capacity(1 + descriptors.len() * 4);
    payload.push(PUBLISH_TOPIC.to_string());
    for d in descriptors {
        payload.push(d.node_id.clone());
        payload.push(d.request_addr.clone());
        payload.push(d.publish_addr.clone());
        payload.push(d.last_seen.to_wire());
    }
    payload
}

/// Decode a publish payload back into descriptors. Entries with an
/// unparsable timestamp are skipped rather than failing the whole batch —
/// publications are best-effort (§4.2).
pub fn decode_snapshot(payload: &[String]) -> Vec<NodeDescriptor> {
    let mut out = Vec::new();
    if payload.first().map(String::as_str) != Some(PUBLISH_TOPIC) {
        return out;
    }
    for chunk in payload[1..].chunks_exact(4) {
        let Ok(last_seen) = Timestamp::from_wire(&chunk[3]) else {
            continue;
        };
        out.push(NodeDescriptor {
            node_id: chunk[0].clone(),
            request_addr: chunk[1].clone(),
            publish_addr: chunk[2].clone(),
            last_seen,
        });
    }
    out
}

/// Outbound dispatch to peer nodes, pooled by destination address. A failed
/// send drops the cached connection; the next dispatch to that address
/// reconnects lazily.
pub struct PeerClientPool {
    connections: Mutex<HashMap<String, TcpStream>>,
}

impl PeerClientPool {
    /// An empty pool; connections are established on first use.
    pub fn new() -> Self {
        Self { connections: Mutex::new(HashMap::new()) }
    }

    /// Send one request payload to `addr` and return the decoded reply
    /// payload. Exposed beyond `PeerDispatch` for the bootstrap `connect`
    /// handshake (§4.7), which isn't part of the `set`/`get` dispatch seam.
    pub async fn send_request(&self, addr: &str, payload: Vec<String>) -> io::Result<Vec<String>> {
        let mut conns = self.connections.lock().await;
        let mut stream = match conns.remove(addr) {
            Some(stream) => stream,
            None => TcpStream::connect(addr).await?,
        };
        let frames = Envelope::new(payload).to_frames();
        let outcome: io::Result<Vec<String>> = async {
            write_frames(&mut stream, &frames).await?;
            let reply_frames = read_frames(&mut stream).await?;
            Envelope::from_frames(reply_frames)
                .map(|e| e.payload)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed reply envelope"))
        }
        .await;
        match outcome {
            Ok(payload) => {
                conns.insert(addr.to_string(), stream);
                Ok(payload)
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for PeerClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerDispatch for PeerClientPool {
    async fn send_set(
        &self,
        request_addr: &str,
        key: &str,
        value: &str,
        timestamp: Timestamp,
    ) -> Result<PeerSetOutcome, DispatchError> {
        let payload = vec![
            PROTOCOL_VERSION.to_string(),
            "set".to_string(),
            key.to_string(),
            value.to_string(),
            timestamp.to_wire(),
        ];
        let reply = self.send_request(request_addr, payload).await.map_err(|_| DispatchError)?;
        Ok(match reply.first().map(String::as_str) {
            Some("0") => PeerSetOutcome::Ok,
            Some("1") => PeerSetOutcome::TooBig,
            _ => PeerSetOutcome::ProtocolError,
        })
    }

    async fn send_get(&self, request_addr: &str, key: &str) -> Result<PeerGetReply, DispatchError> {
        let payload = vec![PROTOCOL_VERSION.to_string(), "get".to_string(), key.to_string()];
        let reply = self.send_request(request_addr, payload).await.map_err(|_| DispatchError)?;
        if reply.first().map(String::as_str) != Some("0") {
            return Err(DispatchError);
        }
        Ok(PeerGetReply {
            value: reply.get(1).cloned().unwrap_or_default(),
            timestamp: reply.get(2).cloned().unwrap_or_else(|| MISS_TIMESTAMP_LITERAL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_snapshot_roundtrip() {
        let descriptors = vec![NodeDescriptor {
            node_id: "n1".to_string(),
            request_addr: "n1:req".to_string(),
            publish_addr: "n1:pub".to_string(),
            last_seen: Timestamp::from_wire("2026:01:01:00:00:00").unwrap(),
        }];
        let payload = encode_snapshot(&descriptors);
        let decoded = decode_snapshot(&payload);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].node_id, "n1");
    }

    #[test]
    fn decode_rejects_wrong_topic() {
        let payload = vec!["x".to_string()];
        assert!(decode_snapshot(&payload).is_empty());
    }

    #[test]
    fn decode_skips_malformed_entry() {
        let payload = vec![
            PUBLISH_TOPIC.to_string(),
            "n1".to_string(),
            "n1:req".to_string(),
            "n1:pub".to_string(),
            "not-a-timestamp".to_string(),
        ];
        assert!(decode_snapshot(&payload).is_empty());
    }
}
