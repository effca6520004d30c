/*
 * Created on Mon Mar 30 2026
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

//! # `REPLCONF` queries
//!
//! The replication vocabulary:
//! - `listening-port <port>` and `capa <...>` are handshake steps a
//!   replica-to-be sends a primary; both are acknowledged with `+OK`
//! - `GETACK *` arrives on a replica's upstream link; the answer is
//!   `REPLCONF ACK <processed>` and from then on the replica volunteers an
//!   ACK after every write it applies
//! - `ACK <offset>` lands on the primary's replica-sink connections and is
//!   handled there, not here

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::queryengine::ActionIter;
use crate::resp::BytesWrapper;
use crate::util;
use bytes::Bytes;
use std::io::Result as IoResult;

/// Run a `REPLCONF` query
pub async fn replconf<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let subcommand = match act.next() {
        Some(subcommand) => subcommand,
        None => return util::err(groups::WRONG_ARG_COUNT),
    };
    if subcommand.eq_ignore_ascii_case(b"listening-port") {
        if let Some(port) = act.next() {
            log::debug!(
                "Replica announced listening port {}",
                String::from_utf8_lossy(&port)
            );
        }
        con.write_response(groups::OK).await?;
    } else if subcommand.eq_ignore_ascii_case(b"capa") {
        con.write_response(groups::OK).await?;
    } else if subcommand.eq_ignore_ascii_case(b"GETACK") {
        let repl = handle.replication();
        repl.enable_ack_reporting();
        // the GETACK frame itself was accounted before execution, so the
        // reported total includes it
        write_ack(con, repl.processed_from_master()).await?;
    } else if subcommand.eq_ignore_ascii_case(b"ACK") {
        // a stray ACK outside a replica-sink connection carries nothing we
        // can anchor it to; swallow it
    } else {
        return util::err(groups::UNKNOWN_REPLCONF_COMMAND);
    }
    Ok(())
}

/// Write a `REPLCONF ACK <offset>` frame
pub async fn write_ack<T: BufferedSocketStream>(
    con: &mut Connection<T>,
    offset: u64,
) -> IoResult<()> {
    con.write_array_length(3).await?;
    con.write_response(BytesWrapper(Bytes::from_static(b"REPLCONF")))
        .await?;
    con.write_response(BytesWrapper(Bytes::from_static(b"ACK")))
        .await?;
    con.write_response(BytesWrapper(Bytes::from(
        offset.to_string().into_bytes(),
    )))
    .await?;
    Ok(())
}
