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

//! Failure scenario (§8 S6): one of a key's owners is unreachable. A `set`
//! fanning out to it surfaces as a timeout rather than hanging or silently
//! dropping the write elsewhere; a `get` racing it surfaces an ordinary miss
//! if no reachable owner has the key, since §4.6 step 5 does not distinguish
//! a timeout from a miss on reads.

mod support;

use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use meshcache::core::types::{NodeDescriptor, Timestamp};
use support::{api_get, api_set, fast_config, find_key_owned_by, start_node};

/// An address nothing is listening on: bind briefly to claim a free port,
/// then drop the listener so connecting to it fails fast with
/// connection-refused instead of depending on an arbitrary unused port
/// already being free.
fn unreachable_addr() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

#[tokio::test]
async fn set_fanout_to_an_unreachable_owner_surfaces_as_timeout() {
    let mut config = fast_config();
    config.request_deadline = Duration::from_millis(200);
    let node_a = start_node("timeout-a", 19401, 19402, 19403, config).await;

    node_a.core.observe_peer(
        NodeDescriptor {
            node_id: "ghost".to_string(),
            request_addr: unreachable_addr(),
            publish_addr: "127.0.0.1:1".to_string(),
            last_seen: Timestamp::now(),
        },
        Timestamp::now(),
    );

    let key = find_key_owned_by(&node_a.core, &["timeout-a", "ghost"]);

    let reply = api_set(&node_a.client, &node_a.api_addr, &key, "v").await;
    assert_eq!(reply, vec!["2".to_string()]);
}

#[tokio::test]
async fn get_with_an_unreachable_owner_and_no_hit_surfaces_as_miss() {
    let mut config = fast_config();
    config.request_deadline = Duration::from_millis(200);
    let node_a = start_node("timeout-b", 19411, 19412, 19413, config).await;

    node_a.core.observe_peer(
        NodeDescriptor {
            node_id: "ghost2".to_string(),
            request_addr: unreachable_addr(),
            publish_addr: "127.0.0.1:1".to_string(),
            last_seen: Timestamp::now(),
        },
        Timestamp::now(),
    );

    let key = find_key_owned_by(&node_a.core, &["timeout-b", "ghost2"]);

    let reply = api_get(&node_a.client, &node_a.api_addr, &key).await;
    assert_eq!(reply, vec!["0".to_string(), String::new()]);
}
