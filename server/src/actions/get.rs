/*
 * Created on Sun Mar 29 2026
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

//! # `GET` queries
//! This module provides functions to work with `GET` queries

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::queryengine::ActionIter;
use crate::resp::BytesWrapper;
use crate::util;

/// Run a `GET` query
pub async fn get<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let key = match act.next() {
        Some(key) => key,
        None => return util::err(groups::WRONG_ARG_COUNT),
    };
    // a read may reap an expired entry, so this takes the write path
    match handle.get(&key) {
        Some(value) => con.write_response(BytesWrapper(value)).await?,
        None => con.write_response(groups::NIL).await?,
    }
    Ok(())
}
