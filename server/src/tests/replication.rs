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

//! Replication tests: the handshake, offset accounting and the `WAIT`
//! barrier, driven with fake peers over real sockets

use super::{query_parts, simple, start_server, TestClient};
use crate::config::ConfigSet;
use crate::protocol::Element;
use crate::replication::replica;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::time;

/// Handshake + snapshot + first propagated command, against a fake primary.
/// The first command is shipped in the same segment as the snapshot: the
/// replica must not need a transport boundary between the two
#[tokio::test]
async fn test_replica_handshake_against_fake_primary() {
    let primary = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let primary_addr = primary.local_addr().unwrap();
    let cfg = ConfigSet {
        port: 6380,
        replicaof: Some(("localhost".to_owned(), primary_addr.port())),
        ..ConfigSet::default()
    };
    let db = crate::corestore::Corestore::new(cfg, Vec::new());
    let replica_db = db.clone();
    tokio::spawn(async move {
        let upstream = replica::bootstrap(&replica_db, "localhost", primary_addr.port())
            .await
            .unwrap();
        let _ = replica::stream_commands(replica_db, upstream).await;
    });

    let (stream, _) = primary.accept().await.unwrap();
    let mut link = TestClient {
        stream,
        buffer: Vec::new(),
    };

    // the four handshake steps, in order
    assert_eq!(query_parts(&link.read_query().await), vec![b"PING".to_vec()]);
    link.send_raw(b"+PONG\r\n").await;
    assert_eq!(
        query_parts(&link.read_query().await),
        vec![
            b"REPLCONF".to_vec(),
            b"listening-port".to_vec(),
            b"6380".to_vec()
        ]
    );
    link.send_raw(b"+OK\r\n").await;
    assert_eq!(
        query_parts(&link.read_query().await),
        vec![b"REPLCONF".to_vec(), b"capa".to_vec(), b"psync2".to_vec()]
    );
    link.send_raw(b"+OK\r\n").await;
    assert_eq!(
        query_parts(&link.read_query().await),
        vec![b"PSYNC".to_vec(), b"?".to_vec(), b"-1".to_vec()]
    );

    // FULLRESYNC, the snapshot payload and the first SET in one segment
    link.send_raw(
        b"+FULLRESYNC 75cd7bc10c49047e0d163660f3b90625b1af31dc 0\r\n\
          $10\r\nREDIS0007\xff\
          *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n",
    )
    .await;

    // the replica applies the write without answering it
    let mut applied = false;
    for _ in 0..100 {
        if db.get(b"k").map(|v| v.to_vec()) == Some(b"v".to_vec()) {
            applied = true;
            break;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "the propagated SET never reached the keyspace");

    // GETACK: the reported total covers the SET (27 bytes) plus the GETACK
    // frame itself (37 bytes)
    link.send_raw(b"*3\r\n$8\r\nREPLCONF\r\n$6\r\nGETACK\r\n$1\r\n*\r\n")
        .await;
    assert_eq!(
        query_parts(&link.read_query().await),
        vec![b"REPLCONF".to_vec(), b"ACK".to_vec(), b"64".to_vec()]
    );

    // once ACK reporting is on, an applied write volunteers its own ACK:
    // 64 + 29 bytes for this frame
    link.send_raw(b"*3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n")
        .await;
    assert_eq!(
        query_parts(&link.read_query().await),
        vec![b"REPLCONF".to_vec(), b"ACK".to_vec(), b"93".to_vec()]
    );
}

/// A fake replica: connects, completes `PSYNC`, skips the snapshot
async fn fake_replica(addr: std::net::SocketAddr) -> TestClient {
    let mut link = TestClient::connect(addr).await;
    link.send_raw(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
        .await;
    let resync = link.read_status_line().await;
    assert!(resync.starts_with("FULLRESYNC "));
    link.skip_raw_payload().await;
    link
}

#[tokio::test]
async fn test_psync_ships_replid_and_empty_snapshot() {
    let (addr, db, _signal) = start_server(ConfigSet::default()).await;
    let mut link = TestClient::connect(addr).await;
    link.send_raw(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
        .await;
    let resync = link.read_status_line().await;
    assert_eq!(
        resync,
        format!("FULLRESYNC {} 0", db.replication().replid())
    );
    link.skip_raw_payload().await;
    // the registry now holds one replica
    for _ in 0..100 {
        if db.replication().replica_count() == 1 {
            break;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(db.replication().replica_count(), 1);
}

#[tokio::test]
async fn test_writes_are_propagated_in_order() {
    let (addr, db, _signal) = start_server(ConfigSet::default()).await;
    let mut replica_link = fake_replica(addr).await;
    while db.replication().replica_count() != 1 {
        time::sleep(Duration::from_millis(5)).await;
    }
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));
    client.send_raw(b"*2\r\n$3\r\nDEL\r\n$3\r\nfoo\r\n").await;
    assert_eq!(client.read_element().await, Element::Integer(1));
    // reads are not propagated
    client.send_raw(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await;
    assert_eq!(client.read_element().await, Element::Null);

    // the replica sees the two writes, verbatim and in issue order
    assert_eq!(
        query_parts(&replica_link.read_query().await),
        vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()]
    );
    assert_eq!(
        query_parts(&replica_link.read_query().await),
        vec![b"DEL".to_vec(), b"foo".to_vec()]
    );
    // offset: 31 bytes of SET plus 22 bytes of DEL
    assert_eq!(db.replication().master_offset(), 53);
}

#[tokio::test]
async fn test_wait_satisfied_by_acks() {
    let (addr, db, _signal) = start_server(ConfigSet::default()).await;
    let mut replica_a = fake_replica(addr).await;
    let mut replica_b = fake_replica(addr).await;
    while db.replication().replica_count() != 2 {
        time::sleep(Duration::from_millis(5)).await;
    }

    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));

    // both replicas consume the propagated SET and acknowledge its 31 bytes
    replica_a.read_query().await;
    replica_b.read_query().await;
    replica_a
        .send_raw(b"*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$2\r\n31\r\n")
        .await;
    replica_b
        .send_raw(b"*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$2\r\n31\r\n")
        .await;
    // give the sink tasks a beat to record the acknowledgments
    time::sleep(Duration::from_millis(150)).await;

    let started = Instant::now();
    client
        .send_raw(b"*3\r\n$4\r\nWAIT\r\n$1\r\n2\r\n$4\r\n5000\r\n")
        .await;
    assert_eq!(client.read_element().await, Element::Integer(2));
    assert!(
        started.elapsed() < Duration::from_millis(1000),
        "a satisfied WAIT should answer promptly"
    );
}

#[tokio::test]
async fn test_wait_times_out_with_partial_acks() {
    let (addr, db, _signal) = start_server(ConfigSet::default()).await;
    let mut replica_a = fake_replica(addr).await;
    let _replica_b = fake_replica(addr).await;
    while db.replication().replica_count() != 2 {
        time::sleep(Duration::from_millis(5)).await;
    }

    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await;
    assert_eq!(client.read_element().await, simple("OK"));

    // only one replica acknowledges
    replica_a.read_query().await;
    replica_a
        .send_raw(b"*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$2\r\n31\r\n")
        .await;
    time::sleep(Duration::from_millis(150)).await;

    let started = Instant::now();
    client
        .send_raw(b"*3\r\n$4\r\nWAIT\r\n$1\r\n2\r\n$3\r\n300\r\n")
        .await;
    assert_eq!(client.read_element().await, Element::Integer(1));
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(250),
        "WAIT answered before its deadline ({elapsed:?})"
    );
}

#[tokio::test]
async fn test_wait_and_psync_are_primary_only() {
    let cfg = ConfigSet {
        replicaof: Some(("localhost".to_owned(), 1)),
        ..ConfigSet::default()
    };
    // the upstream link is never brought up: role checks don't need it
    let (addr, _db, _signal) = start_server(cfg).await;
    let mut client = TestClient::connect(addr).await;
    client
        .send_raw(b"*3\r\n$4\r\nWAIT\r\n$1\r\n1\r\n$3\r\n100\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR WAIT not supported in slave mode".to_owned())
    );
    client
        .send_raw(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
        .await;
    assert_eq!(
        client.read_element().await,
        Element::Error("ERR PSYNC not supported in slave mode".to_owned())
    );
}
