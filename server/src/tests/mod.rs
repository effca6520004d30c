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

//! This module contains automated tests for queries and replication,
//! driven over real sockets against a server bound to an ephemeral port

mod kvengine;
mod replication;

use crate::config::ConfigSet;
use crate::corestore::Corestore;
use crate::dbnet::{BaseListener, Listener};
use crate::protocol::{self, Element, ParseError, ParseResult, Query};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Semaphore};

/// Spin up a listener on an ephemeral port. The returned broadcast sender
/// must be kept alive for the duration of the test: dropping it reads as a
/// termination signal to every connection handler
async fn start_server(cfg: ConfigSet) -> (SocketAddr, Corestore, broadcast::Sender<()>) {
    let db = Corestore::new(cfg, Vec::new());
    let climit = Arc::new(Semaphore::new(64));
    let (signal, _) = broadcast::channel(1);
    let base = BaseListener::init(&db, "127.0.0.1", 0, climit, signal.clone())
        .await
        .unwrap();
    let addr = base.local_addr().unwrap();
    let mut listener = Listener::new(base);
    tokio::spawn(async move {
        let _ = listener.run().await;
    });
    (addr, db, signal)
}

/// A tiny test client: a socket plus the residual bytes between frames
struct TestClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        TestClient {
            stream: TcpStream::connect(addr).await.unwrap(),
            buffer: Vec::new(),
        }
    }
    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }
    async fn fill(&mut self) {
        let mut chunk = [0u8; 1024];
        let n = self.stream.read(&mut chunk).await.unwrap();
        assert!(n != 0, "peer closed the connection mid-exchange");
        self.buffer.extend_from_slice(&chunk[..n]);
    }
    /// Read one whole response frame
    async fn read_element(&mut self) -> Element {
        loop {
            match protocol::parse_element(&self.buffer) {
                Ok((element, consumed)) => {
                    self.buffer.drain(..consumed);
                    return element;
                }
                Err(ParseError::Incomplete) => self.fill().await,
                Err(ParseError::BadPacket) => panic!("peer sent an unparseable frame"),
            }
        }
    }
    /// Read one whole request frame (the fake-primary/replica direction)
    async fn read_query(&mut self) -> Query {
        loop {
            match protocol::parse_query(&self.buffer) {
                ParseResult::Query(query, consumed) => {
                    self.buffer.drain(..consumed);
                    return query;
                }
                ParseResult::Incomplete => self.fill().await,
                ParseResult::BadPacket => panic!("peer sent an unparseable frame"),
            }
        }
    }
    /// Read one `+...` status line
    async fn read_status_line(&mut self) -> String {
        loop {
            match protocol::parse_status_line(&self.buffer) {
                Ok((line, consumed)) => {
                    self.buffer.drain(..consumed);
                    return line;
                }
                Err(ParseError::Incomplete) => self.fill().await,
                Err(ParseError::BadPacket) => panic!("peer sent an unparseable frame"),
            }
        }
    }
    /// Read a `$<len>\r\n` header plus `len` raw bytes and discard them
    async fn skip_raw_payload(&mut self) {
        let (payload_len, header_len) = loop {
            match protocol::parse_payload_header(&self.buffer) {
                Ok(parsed) => break parsed,
                Err(ParseError::Incomplete) => self.fill().await,
                Err(ParseError::BadPacket) => panic!("peer sent an unparseable frame"),
            }
        };
        while self.buffer.len() < header_len + payload_len {
            self.fill().await;
        }
        self.buffer.drain(..header_len + payload_len);
    }
}

fn simple(text: &str) -> Element {
    Element::Simple(text.to_owned())
}

fn bulk(payload: &[u8]) -> Element {
    Element::Bulk(bytes::Bytes::copy_from_slice(payload))
}

fn query_parts(query: &Query) -> Vec<Vec<u8>> {
    (0..query.len())
        .map(|idx| query.get(idx).unwrap().to_vec())
        .collect()
}
