/*
 * Created on Sat Apr 04 2026
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

//! # The replica sink
//!
//! Once a connection completes `PSYNC` it stops being a request/response
//! client. Its task turns into this pump: propagated frames drain from the
//! registry channel onto the socket (in channel order, which is issue
//! order), while inbound bytes are parsed for `REPLCONF ACK` offsets.

use crate::dbnet::connection::{BufferedSocketStream, Connection, QueryResult};
use crate::protocol::Query;
use crate::util;
use bytes::Bytes;
use std::io::Result as IoResult;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedReceiver;

enum SinkEvent {
    /// A frame to ship to the replica
    Propagate(Bytes),
    /// The registry dropped our channel
    ChannelClosed,
    /// The replica sent us something
    Inbound(QueryResult),
}

/// Pump frames out and acknowledgments in until either side goes away
pub async fn run<C: BufferedSocketStream>(
    con: &mut Connection<C>,
    propagation_rx: &mut UnboundedReceiver<Bytes>,
    last_ack: &Arc<AtomicU64>,
) -> IoResult<()> {
    loop {
        let event = tokio::select! {
            frame = propagation_rx.recv() => match frame {
                Some(frame) => SinkEvent::Propagate(frame),
                None => SinkEvent::ChannelClosed,
            },
            inbound = con.read_query() => SinkEvent::Inbound(inbound?),
        };
        match event {
            SinkEvent::Propagate(frame) => {
                con.write_raw(&frame).await?;
                con.flush_stream().await?;
            }
            SinkEvent::ChannelClosed => return Ok(()),
            SinkEvent::Inbound(QueryResult::Q((query, advance))) => {
                note_ack(&query, last_ack);
                con.advance_buffer(advance);
            }
            SinkEvent::Inbound(QueryResult::Disconnected) => return Ok(()),
            SinkEvent::Inbound(QueryResult::Violation) => {
                log::debug!("Replica sent an unparseable frame, dropping it");
                return Ok(());
            }
        }
    }
}

/// Record a `REPLCONF ACK <offset>`; anything else a replica says is noise
fn note_ack(query: &Query, last_ack: &Arc<AtomicU64>) {
    let is_ack = query.len() == 3
        && query
            .get(0)
            .map(|cmd| cmd.eq_ignore_ascii_case(b"REPLCONF"))
            .unwrap_or(false)
        && query
            .get(1)
            .map(|sub| sub.eq_ignore_ascii_case(b"ACK"))
            .unwrap_or(false);
    if !is_ack {
        return;
    }
    if let Some(offset) = query.get(2).and_then(|raw| util::parse_ascii_u64(raw)) {
        // acknowledged offsets only ever grow
        last_ack.fetch_max(offset, Ordering::Relaxed);
    }
}
