/*
 * Created on Sun Apr 12 2026
 *
 * This file is a part of Cinder
 * Cinder is a free and open-source in-memory key/value store that speaks
 * a line-oriented wire protocol over TCP and supports primary/replica
 * asynchronous replication with snapshot bootstrap
 *
 * Copyright (c) 2026, The Cinder developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Query tests against a running server: the plain key/value surface

use super::{bulk, simple, start_server, TestClient};
use crate::config::ConfigSet;
use crate::protocol::Element;
use std::time::Duration;
use tokio::time;

#[tokio::test]
async fn test_ping() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client.send_raw(b"*1\r\n$4\r\nPING\r\n").await;
    assert_eq!(client.read_element().await, simple("PONG"));
}

#[tokio::test]
async fn test_echo_is_a_simple_string() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client.send_raw(b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n").await;
    assert_eq!(client.read_element().await, simple("hello"));
}

#[tokio::test]
async fn test_set_get_roundtrip() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await;
    assert_eq!(client.read_element().await, bulk(b"bar"));
    // a missing key is a null bulk
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$2\r\nxx\r\n").await;
    assert_eq!(client.read_element().await, Element::Null);
}

#[tokio::test]
async fn test_set_with_expiry() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$3\r\n100\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));
    // alive before the deadline
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(client.read_element().await, bulk(b"v"));
    time::sleep(Duration::from_millis(150)).await;
    // the read after the deadline reaps it
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(client.read_element().await, Element::Null);
    // and the keyspace listing agrees
    client.send_raw(b"*2\r\n$4\r\nKEYS\r\n$1\r\n*\r\n").await;
    assert_eq!(client.read_element().await, Element::Array(Vec::new()));
}

#[tokio::test]
async fn test_del() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));
    // DEL answers :1 for present and absent keys alike
    client.send_raw(b"*2\r\n$3\r\nDEL\r\n$1\r\na\r\n").await;
    assert_eq!(client.read_element().await, Element::Integer(1));
    client.send_raw(b"*2\r\n$3\r\nDEL\r\n$1\r\na\r\n").await;
    assert_eq!(client.read_element().await, Element::Integer(1));
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n").await;
    assert_eq!(client.read_element().await, Element::Null);
}

#[tokio::test]
async fn test_keys_ignores_the_pattern() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n")
        .await;
    client.read_element().await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\nb\r\n$1\r\n2\r\n")
        .await;
    client.read_element().await;
    client
        .send_raw(b"*2\r\n$4\r\nKEYS\r\n$7\r\nnomatch\r\n")
        .await;
    match client.read_element().await {
        Element::Array(items) => {
            let mut keys: Vec<Vec<u8>> = items
                .into_iter()
                .map(|item| match item {
                    Element::Bulk(blob) => blob.to_vec(),
                    other => panic!("expected a bulk key, got {other:?}"),
                })
                .collect();
            keys.sort();
            assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
        }
        other => panic!("expected an array, got {other:?}"),
    }
}

#[tokio::test]
async fn test_config_get() {
    let cfg = ConfigSet {
        dir: "/data".to_owned(),
        dbfilename: "store.rdb".to_owned(),
        ..ConfigSet::default()
    };
    let (addr, _db, _signal) = start_server(cfg).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$3\r\ndir\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Array(vec![bulk(b"dir"), bulk(b"/data")])
    );
    client
        .send_raw(b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$10\r\ndbfilename\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Array(vec![bulk(b"dbfilename"), bulk(b"store.rdb")])
    );
    client
        .send_raw(b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$7\r\nmaxmems\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR Unknown CONFIG parameter".to_owned())
    );
}

#[tokio::test]
async fn test_unknown_command_and_arity_errors() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client.send_raw(b"*1\r\n$5\r\nFLUSH\r\n").await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR unknown command".to_owned())
    );
    // GET takes exactly one key
    client.send_raw(b"*1\r\n$3\r\nGET\r\n").await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR wrong number of arguments".to_owned())
    );
    client
        .send_raw(b"*3\r\n$3\r\nGET\r\n$1\r\na\r\n$1\r\nb\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR wrong number of arguments".to_owned())
    );
    // case-insensitive lookup still works afterwards
    client.send_raw(b"*1\r\n$4\r\nping\r\n").await;
    assert_eq!(client.read_element().await, simple("PONG"));
}

#[tokio::test]
async fn test_pipelined_requests_in_one_segment() {
    // two requests coalesced into a single write come back in order
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("PONG"));
    assert_eq!(client.read_element().await, simple("hi"));
}

#[tokio::test]
async fn test_info_replication_section() {
    let (addr, _db, _signal) = start_server(ConfigSet::default()).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*2\r\n$4\r\nINFO\r\n$11\r\nreplication\r\n")
        .await;
    let body = match client.read_element().await {
        Element::Bulk(blob) => String::from_utf8(blob.to_vec()).unwrap(),
        other => panic!("expected a bulk body, got {other:?}"),
    };
    assert!(body.starts_with("# Replication\r\n"));
    assert!(body.contains("role:master\r\n"));
    assert!(body.contains("master_repl_offset:0\r\n"));
    let replid_line = body
        .lines()
        .find(|line| line.starts_with("master_replid:"))
        .unwrap();
    let replid = replid_line.trim_end().trim_start_matches("master_replid:");
    assert_eq!(replid.len(), 40);
    assert!(replid.bytes().all(|b| b.is_ascii_hexdigit()));
}
