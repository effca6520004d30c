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

//! # `INFO` queries
//!
//! Only the replication section exists. A replica reports the offset it has
//! consumed from its upstream; a primary reports the offset it has fed its
//! replicas.

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::queryengine::ActionIter;
use crate::replication::Role;
use crate::resp::BytesWrapper;
use bytes::Bytes;

/// Run an `INFO` query
pub async fn info<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let _section = act.next();
    let repl = handle.replication();
    let (role, offset) = match repl.role() {
        Role::Primary => ("master", repl.master_offset()),
        Role::Replica => ("slave", repl.processed_from_master()),
    };
    let body = format!(
        "# Replication\r\nrole:{role}\r\nmaster_replid:{replid}\r\nmaster_repl_offset:{offset}\r\n",
        replid = repl.replid(),
    );
    con.write_response(BytesWrapper(Bytes::from(body.into_bytes())))
        .await?;
    Ok(())
}
