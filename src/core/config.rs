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

//! Cluster-wide configuration knobs (§6). `REPLICAS`, `REDUNDANCY`, and the
//! hash function must be identical across every node in a cluster; see
//! `ClusterParams` and the join-time negotiation in `core::peer_protocol`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the config file.
    #[error("read config file")]
    Read,
    /// Could not parse the config file as TOML.
    #[error("parse config file")]
    Parse,
    /// Peer expiry window must be at least 3x the publish interval (§4.1).
    #[error("peer expiry window must be >= 3x publish interval")]
    ExpiryTooShort,
    /// `REPLICAS` or `REDUNDANCY` were zero.
    #[error("REPLICAS and REDUNDANCY must be non-zero")]
    ZeroRingParam,
}

/// The ring parameters that must match cluster-wide (§4.3, §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Virtual positions per node per ring.
    pub replicas: u32,
    /// Number of independent rings (replication factor).
    pub redundancy: u32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            replicas: 128,
            redundancy: 2,
        }
    }
}

/// Full node configuration, loadable from TOML and overridable by CLI flags.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Ring parameters (must match cluster-wide).
    #[serde(default)]
    pub cluster: ClusterParams,
    /// Maximum aggregate character budget of the local cache store.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Interval at which this node publishes its membership snapshot.
    #[serde(default = "default_publish_interval_ms", with = "duration_ms")]
    pub publish_interval: Duration,
    /// Age after which an unseen peer is swept from the registry.
    #[serde(default = "default_expiry_ms", with = "duration_ms")]
    pub peer_expiry: Duration,
    /// Deadline the API Router waits for owner replies before timing out.
    #[serde(default = "default_deadline_ms", with = "duration_ms")]
    pub request_deadline: Duration,
}

fn default_max_size() -> usize {
    64 * 1024 * 1024
}

fn default_publish_interval_ms() -> Duration {
    Duration::from_millis(1000)
}

fn default_expiry_ms() -> Duration {
    Duration::from_millis(5000)
}

fn default_deadline_ms() -> Duration {
    Duration::from_millis(2500)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterParams::default(),
            max_size: default_max_size(),
            publish_interval: default_publish_interval_ms(),
            peer_expiry: default_expiry_ms(),
            request_deadline: default_deadline_ms(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file, falling back to defaults for absent fields.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::Read)?;
        let cfg: Self = toml::from_str(&raw).map_err(|_| ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the cross-field invariants from §4.1 and §4.3.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.replicas == 0 || self.cluster.redundancy == 0 {
            return Err(ConfigError::ZeroRingParam);
        }
        if self.peer_expiry < self.publish_interval.saturating_mul(3) {
            return Err(ConfigError::ExpiryTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn short_expiry_rejected() {
        let mut cfg = NodeConfig::default();
        cfg.peer_expiry = Duration::from_millis(100);
        assert!(matches!(cfg.validate(), Err(ConfigError::ExpiryTooShort)));
    }

    #[test]
    fn zero_ring_param_rejected() {
        let mut cfg = NodeConfig::default();
        cfg.cluster.replicas = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroRingParam)));
    }
}
