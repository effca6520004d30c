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

//! # `PSYNC` queries
//!
//! The last step of a replica's handshake. The primary always answers with a
//! full resynchronization: the `+FULLRESYNC <replid> 0` status line followed
//! by the snapshot as a length-prefixed raw payload. The payload carries no
//! trailing CRLF; the propagated command stream begins immediately after it.
//! Since writes are not persisted, the snapshot is the fixed empty dump.

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::diskstore::rdb::EMPTY_SNAPSHOT;
use crate::protocol::responses::groups;
use crate::queryengine::{ActionIter, PostAction};
use crate::util;

/// Run a `PSYNC` query. On success the connection must be handed over to the
/// replica sink
pub async fn psync<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<PostAction> {
    let repl = handle.replication();
    if !repl.is_primary() {
        return util::err(groups::PSYNC_IN_REPLICA_MODE);
    }
    // the replica sends `PSYNC ? -1`; with partial resync unsupported the
    // arguments don't change the outcome
    let _requested_replid = act.next();
    let _requested_offset = act.next();
    con.write_response(format!("+FULLRESYNC {} 0\r\n", repl.replid()).into_bytes())
        .await?;
    let mut payload = format!("${}\r\n", EMPTY_SNAPSHOT.len()).into_bytes();
    payload.extend_from_slice(EMPTY_SNAPSHOT);
    con.write_response(payload).await?;
    Ok(PostAction::BecomeReplica)
}
