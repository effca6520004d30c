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

//! # The replica side of replication
//!
//! [`bootstrap`] drives the fixed handshake against the primary and consumes
//! the snapshot; [`stream_commands`] then executes the propagated command
//! stream on the same connection for the life of the process.
//!
//! The framer does not require any transport boundary between the snapshot
//! body and the first command: whatever the primary coalesced behind the
//! payload stays in the connection buffer and parses as ordinary frames.

use crate::actions::{replconf, ActionError};
use crate::corestore::Corestore;
use crate::dbnet::connection::{Connection, QueryResult};
use crate::protocol::encode_command;
use crate::queryengine::{self, ConnOrigin};
use crate::util::error::{CinderResult, Error};
use tokio::net::TcpStream;

/// Where the handshake stands. Each send advances the state; each state
/// expects one specific answer
#[derive(Debug, Clone, Copy, PartialEq)]
enum HandshakeState {
    NotStarted,
    PingSent,
    PortSent,
    CapaSent,
    PsyncSent,
    Completed,
}

/// Connect to the primary and complete the handshake plus the snapshot
/// bootstrap. Every failure here is fatal to startup
pub async fn bootstrap(
    db: &Corestore,
    master_host: &str,
    master_port: u16,
) -> CinderResult<Connection<TcpStream>> {
    // the host is coerced to loopback
    if master_host != "localhost" && master_host != "127.0.0.1" {
        log::warn!("Primary host '{master_host}' coerced to 127.0.0.1");
    }
    let stream = TcpStream::connect(("127.0.0.1", master_port))
        .await
        .map_err(|e| {
            Error::Replication(format!(
                "failed to connect to the primary at port {master_port}: {e}"
            ))
        })?;
    let mut con = Connection::new(stream);
    let mut state = HandshakeState::NotStarted;

    send(&mut con, &[b"PING".as_slice()], &mut state, HandshakeState::PingSent).await?;
    expect(&mut con, state, "PONG").await?;

    let port = db.cfg().port.to_string();
    send(
        &mut con,
        &[b"REPLCONF".as_slice(), b"listening-port", port.as_bytes()],
        &mut state,
        HandshakeState::PortSent,
    )
    .await?;
    expect(&mut con, state, "OK").await?;

    send(
        &mut con,
        &[b"REPLCONF".as_slice(), b"capa", b"psync2"],
        &mut state,
        HandshakeState::CapaSent,
    )
    .await?;
    expect(&mut con, state, "OK").await?;

    send(
        &mut con,
        &[b"PSYNC".as_slice(), b"?", b"-1"],
        &mut state,
        HandshakeState::PsyncSent,
    )
    .await?;
    let resync = read_line(&mut con, state).await?;
    if !resync.starts_with("FULLRESYNC") {
        return Err(Error::Replication(format!(
            "handshake failed in state {state:?}: expected +FULLRESYNC, got +{resync}"
        )));
    }
    state = HandshakeState::Completed;
    log::info!("Primary answered: {resync}");

    let snapshot_len = con
        .consume_raw_payload()
        .await
        .map_err(|e| Error::ioerror_extra(e, "receiving the bootstrap snapshot"))?;
    log::info!(
        "Discarded the {snapshot_len}-byte bootstrap snapshot; handshake {state:?}, switching to the command stream"
    );
    Ok(con)
}

async fn send(
    con: &mut Connection<TcpStream>,
    parts: &[&[u8]],
    state: &mut HandshakeState,
    next: HandshakeState,
) -> CinderResult<()> {
    con.write_raw(&encode_command(parts)).await?;
    con.flush_stream().await?;
    *state = next;
    Ok(())
}

async fn read_line(con: &mut Connection<TcpStream>, state: HandshakeState) -> CinderResult<String> {
    con.read_status_line()
        .await
        .map_err(|e| Error::Replication(format!("handshake failed in state {state:?}: {e}")))
}

async fn expect(
    con: &mut Connection<TcpStream>,
    state: HandshakeState,
    want: &str,
) -> CinderResult<()> {
    let line = read_line(con, state).await?;
    if line == want {
        Ok(())
    } else {
        Err(Error::Replication(format!(
            "handshake failed in state {state:?}: expected +{want}, got +{line}"
        )))
    }
}

/// Execute the propagated command stream until the upstream goes away.
///
/// Every fully framed command is accounted into `processed_from_master`
/// *before* it runs, so an ACK requested by the frame being executed already
/// includes that frame. Replies are suppressed except for the commands
/// flagged reply-to-upstream, and once the primary has asked for an ACK the
/// replica volunteers one after each applied write
pub async fn stream_commands(db: Corestore, mut con: Connection<TcpStream>) -> CinderResult<()> {
    loop {
        match con.read_query().await? {
            QueryResult::Q((query, advance)) => {
                db.replication().note_processed(advance as u64);
                let is_write = query
                    .get(0)
                    .map(|name| {
                        name.eq_ignore_ascii_case(b"SET") || name.eq_ignore_ascii_case(b"DEL")
                    })
                    .unwrap_or(false);
                let raw_frame = con.raw_frame(advance);
                let outcome =
                    queryengine::execute(&db, &mut con, query, raw_frame, ConnOrigin::Upstream)
                        .await;
                con.advance_buffer(advance);
                match outcome {
                    Ok(_) => {}
                    Err(ActionError::ActionError(e)) => con.write_response(e).await?,
                    Err(ActionError::IoError(e)) => return Err(e.into()),
                }
                con.set_muted(false);
                if is_write && db.replication().ack_reporting_enabled() {
                    replconf::write_ack(&mut con, db.replication().processed_from_master()).await?;
                }
                con.flush_stream().await?;
            }
            QueryResult::Disconnected => {
                log::error!("The primary closed the upstream connection");
                return Ok(());
            }
            QueryResult::Violation => {
                log::error!("The primary sent an unparseable frame; dropping the upstream link");
                return Ok(());
            }
        }
    }
}
