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

//! Shared domain types: node descriptors, cache entries, and the UTC
//! timestamp representation used on the wire.

use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

/// Opaque, printable, cluster-unique node identifier.
pub type NodeId = String;

/// Protocol version understood by this build. Any other value on the wire
/// is a `version-not-supported` error (§4.5).
pub const PROTOCOL_VERSION: &str = "1";

/// Literal timestamp frame used to represent a cache miss on `get` (§4.5),
/// distinct from the `YYYY:MM:DD:HH:MM:SS` format used for real entries.
pub const MISS_TIMESTAMP_LITERAL: &str = "0";

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]:[month]:[day]:[hour]:[minute]:[second]");

/// Errors parsing or formatting a wire timestamp.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The frame did not match `YYYY:MM:DD:HH:MM:SS` exactly.
    #[error("malformed timestamp")]
    Malformed,
}

/// A UTC timestamp, always rendered/parsed in the exact-width
/// `YYYY:MM:DD:HH:MM:SS` wire format (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Current wall-clock time, UTC.
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// The UNIX epoch: a fixed point guaranteed to be older than any real
    /// timestamp, used by tests as a baseline "ancient" last-seen/write time.
    pub fn epoch() -> Self {
        Self(OffsetDateTime::UNIX_EPOCH)
    }

    /// Elapsed wall-clock time since `earlier`, saturating to zero if
    /// `earlier` is not actually earlier (clock skew, test fixtures).
    pub fn duration_since(self, earlier: Timestamp) -> std::time::Duration {
        (self.0 - earlier.0)
            .try_into()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Render as the wire format.
    pub fn to_wire(self) -> String {
        self.0
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| "0000:00:00:00:00:00".to_string())
    }

    /// Parse the exact-width wire format. Producers zero-pad; parsers require
    /// exact width (4-digit year, 2-digit everything else), per §6.
    pub fn from_wire(s: &str) -> Result<Self, TimestampError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 || parts[0].len() != 4 || parts[1..].iter().any(|p| p.len() != 2) {
            return Err(TimestampError::Malformed);
        }

        let year: i32 = parts[0].parse().map_err(|_| TimestampError::Malformed)?;
        let month: u8 = parts[1].parse().map_err(|_| TimestampError::Malformed)?;
        let day: u8 = parts[2].parse().map_err(|_| TimestampError::Malformed)?;
        let hour: u8 = parts[3].parse().map_err(|_| TimestampError::Malformed)?;
        let minute: u8 = parts[4].parse().map_err(|_| TimestampError::Malformed)?;
        let second: u8 = parts[5].parse().map_err(|_| TimestampError::Malformed)?;

        let month = time::Month::try_from(month).map_err(|_| TimestampError::Malformed)?;
        let date = time::Date::from_calendar_date(year, month, day)
            .map_err(|_| TimestampError::Malformed)?;
        let time = time::Time::from_hms(hour, minute, second)
            .map_err(|_| TimestampError::Malformed)?;
        Ok(Self(OffsetDateTime::new_utc(date, time)))
    }
}

/// A node's advertised identity and endpoints (§3).
///
/// `publish_addr`/`request_addr` are informational and are overwritten by the
/// latest incoming descriptor for a given `node_id` (a node may restart on a
/// new address); `node_id` is the primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Cluster-unique opaque identifier.
    pub node_id: NodeId,
    /// Peer-protocol endpoint (set/get/connect).
    pub request_addr: String,
    /// Publish-socket endpoint subscribers bind to.
    pub publish_addr: String,
    /// Last time this node was observed alive.
    pub last_seen: Timestamp,
}

/// A stored cache entry. An empty `value` is never represented as an entry —
/// it is a delete at the `Store` boundary (§3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Stored value. Never empty for a live entry.
    pub value: String,
    /// Timestamp supplied by the originating API node at ingress.
    pub timestamp: Timestamp,
}

impl CacheEntry {
    /// Character cost counted against `MAX_SIZE`: `|key| + |value|`.
    pub fn cost(key: &str, value: &str) -> usize {
        key.chars().count() + value.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_roundtrip() {
        let wire = "2026:07:26:13:05:09";
        let ts = Timestamp::from_wire(wire).unwrap();
        assert_eq!(ts.to_wire(), wire);
    }

    #[test]
    fn timestamp_rejects_short_width() {
        assert!(Timestamp::from_wire("2026:7:26:13:05:09").is_err());
        assert!(Timestamp::from_wire("not-a-timestamp").is_err());
    }

    #[test]
    fn timestamp_ordering() {
        let a = Timestamp::from_wire("2026:01:01:00:00:00").unwrap();
        let b = Timestamp::from_wire("2026:01:01:00:00:01").unwrap();
        assert!(a < b);
        assert!(Timestamp::epoch() < a);
    }
}
