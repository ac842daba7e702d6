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

//! Single-node scenarios (§8 S1, S2, S3): a lone node is its own sole owner
//! for every key, so these exercise the API Router's local fast path over a
//! real TCP round-trip.

mod support;

use support::{api_get, api_set, fast_config, start_node};

#[tokio::test]
async fn set_then_get_roundtrip() {
    let node = start_node("solo-a", 19101, 19102, 19103, fast_config()).await;

    let reply = api_set(&node.client, &node.api_addr, "alpha", "one").await;
    assert_eq!(reply, vec!["0".to_string()]);

    let reply = api_get(&node.client, &node.api_addr, "alpha").await;
    assert_eq!(reply, vec!["0".to_string(), "one".to_string()]);
}

#[tokio::test]
async fn get_of_unset_key_is_a_miss() {
    let node = start_node("solo-b", 19111, 19112, 19113, fast_config()).await;

    let reply = api_get(&node.client, &node.api_addr, "never-set").await;
    assert_eq!(reply, vec!["0".to_string(), String::new()]);
}

#[tokio::test]
async fn delete_via_empty_value_then_miss() {
    let node = start_node("solo-c", 19121, 19122, 19123, fast_config()).await;

    api_set(&node.client, &node.api_addr, "k", "v").await;
    let reply = api_set(&node.client, &node.api_addr, "k", "").await;
    assert_eq!(reply, vec!["0".to_string()]);

    let reply = api_get(&node.client, &node.api_addr, "k").await;
    assert_eq!(reply, vec!["0".to_string(), String::new()]);
}

#[tokio::test]
async fn entry_too_big_for_max_size_is_rejected() {
    let mut config = fast_config();
    config.max_size = 4;
    let node = start_node("solo-d", 19131, 19132, 19133, config).await;

    let reply = api_set(&node.client, &node.api_addr, "key", "way-too-long-value").await;
    assert_eq!(reply, vec!["1".to_string()]);

    // Rejected writes never land in the store.
    let reply = api_get(&node.client, &node.api_addr, "key").await;
    assert_eq!(reply, vec!["0".to_string(), String::new()]);
}

#[tokio::test]
async fn bad_protocol_version_is_rejected() {
    let node = support::start_node("solo-e", 19141, 19142, 19143, fast_config()).await;

    let reply = node
        .client
        .send_request(&node.api_addr, vec!["7".to_string(), "get".to_string(), "k".to_string()])
        .await
        .unwrap();
    assert_eq!(reply, vec!["999".to_string()]);
}
