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

//! Replication scenario (§8 S5): with `REDUNDANCY=2`, a key whose owner
//! tuple spans both nodes in a two-node cluster is readable from either
//! node's API socket after being written through just one of them.

mod support;

use std::time::Duration;

use meshcache::node;
use support::{api_get, api_set, fast_config, find_key_owned_by, start_node};

#[tokio::test]
async fn write_through_one_node_is_readable_from_the_other() {
    let node_a = start_node("rep-a", 19301, 19302, 19303, fast_config()).await;
    let node_b = start_node("rep-b", 19311, 19312, 19313, fast_config()).await;

    node::bootstrap(&node_b.core, &node_b.client, &node_a.request_addr)
        .await
        .expect("bootstrap should succeed");

    // Give gossip a moment so A also knows B, and each side's ring includes
    // both nodes before we search for a dually-owned key.
    for _ in 0..40 {
        if node_a.core.is_known("rep-b") && node_b.core.is_known("rep-a") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    assert!(node_a.core.is_known("rep-b"));
    assert!(node_b.core.is_known("rep-a"));

    let key = find_key_owned_by(&node_a.core, &["rep-a", "rep-b"]);

    let reply = api_set(&node_a.client, &node_a.api_addr, &key, "cross-node-value").await;
    assert_eq!(reply, vec!["0".to_string()], "all owners should accept the write");

    let reply = api_get(&node_b.client, &node_b.api_addr, &key).await;
    assert_eq!(reply, vec!["0".to_string(), "cross-node-value".to_string()]);

    let reply = api_get(&node_a.client, &node_a.api_addr, &key).await;
    assert_eq!(reply, vec!["0".to_string(), "cross-node-value".to_string()]);
}

#[tokio::test]
async fn later_write_wins_regardless_of_entry_node() {
    let node_a = start_node("rep-c", 19321, 19322, 19323, fast_config()).await;
    let node_b = start_node("rep-d", 19331, 19332, 19333, fast_config()).await;

    node::bootstrap(&node_b.core, &node_b.client, &node_a.request_addr)
        .await
        .expect("bootstrap should succeed");
    for _ in 0..40 {
        if node_a.core.is_known("rep-d") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    let key = find_key_owned_by(&node_a.core, &["rep-c", "rep-d"]);

    api_set(&node_a.client, &node_a.api_addr, &key, "first").await;
    let reply = api_set(&node_b.client, &node_b.api_addr, &key, "second").await;
    assert_eq!(reply, vec!["0".to_string()]);

    let reply = api_get(&node_a.client, &node_a.api_addr, &key).await;
    assert_eq!(reply, vec!["0".to_string(), "second".to_string()]);
}
