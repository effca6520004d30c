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

//! # `CONFIG GET` queries
//!
//! Only the two snapshot-related parameters are exposed: `dir` and
//! `dbfilename`. The reply is a two-element array of the parameter name and
//! its value.

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::queryengine::ActionIter;
use crate::resp::BytesWrapper;
use crate::util;
use bytes::Bytes;

/// Run a `CONFIG GET` query
pub async fn cfget<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let (subcommand, parameter) = match (act.next(), act.next()) {
        (Some(subcommand), Some(parameter)) => (subcommand, parameter),
        _ => return util::err(groups::WRONG_ARG_COUNT),
    };
    if !subcommand.eq_ignore_ascii_case(b"GET") {
        return util::err(groups::UNKNOWN_CONFIG_PARAMETER);
    }
    let value = if parameter.eq_ignore_ascii_case(b"dir") {
        handle.cfg().dir.clone()
    } else if parameter.eq_ignore_ascii_case(b"dbfilename") {
        handle.cfg().dbfilename.clone()
    } else {
        return util::err(groups::UNKNOWN_CONFIG_PARAMETER);
    };
    con.write_array_length(2).await?;
    con.write_response(BytesWrapper(parameter)).await?;
    con.write_response(BytesWrapper(Bytes::from(value.into_bytes())))
        .await?;
    Ok(())
}
