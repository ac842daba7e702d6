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

//! The common envelope (§6): `ID* "" payload…` — zero or more routing ids,
//! an empty delimiter frame, then the payload. A reply echoes the same id
//! prefix so a multi-hop transport can route it home; this crate's own
//! transport is single-hop (direct TCP), so `ids` is always empty on the
//! wire it produces, but the split is honored symmetrically in case a
//! future proxying hop prepends routing ids.

/// A decoded envelope: routing id prefix plus payload frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Routing ids to echo back verbatim in the reply.
    pub ids: Vec<String>,
    /// Protocol payload frames (§6's peer/API tables).
    pub payload: Vec<String>,
}

impl Envelope {
    /// Build an envelope with no routing ids (the common case for a
    /// directly-dialed request).
    pub fn new(payload: Vec<String>) -> Self {
        Self { ids: Vec::new(), payload }
    }

    /// Flatten into the wire frame sequence: ids, then an empty delimiter
    /// frame, then payload.
    pub fn to_frames(&self) -> Vec<String> {
        let mut frames = Vec::with_capacity(self.ids.len() + 1 + self.payload.len());
        frames.extend(self.ids.iter().cloned());
        frames.push(String::new());
        frames.extend(self.payload.iter().cloned());
        frames
    }

    /// Split a received frame sequence at the first empty delimiter frame.
    /// `None` if no delimiter is present (malformed envelope).
    pub fn from_frames(frames: Vec<String>) -> Option<Self> {
        let delim = frames.iter().position(String::is_empty)?;
        let mut frames = frames;
        let payload = frames.split_off(delim + 1);
        frames.truncate(delim);
        Some(Self { ids: frames, payload })
    }

    /// Build a reply envelope that echoes this envelope's id prefix.
    pub fn reply(&self, payload: Vec<String>) -> Self {
        Self { ids: self.ids.clone(), payload }
    }
}
