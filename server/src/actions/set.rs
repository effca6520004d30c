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

//! # `SET` queries
//! This module provides functions to work with `SET` queries
//!
//! `SET <key> <value> [PX <milliseconds>]`; the optional `PX` pair gives
//! the entry a relative time-to-live.

use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::queryengine::ActionIter;
use crate::util;

/// Run a `SET` query
pub async fn set<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let (key, value) = match (act.next(), act.next()) {
        (Some(key), Some(value)) => (key, value),
        _ => return util::err(groups::WRONG_ARG_COUNT),
    };
    let ttl_ms = match (act.next(), act.next()) {
        (None, _) => None,
        (Some(option), Some(raw_ms)) if option.eq_ignore_ascii_case(b"PX") => {
            match util::parse_ascii_u64(&raw_ms) {
                Some(ms) => Some(ms),
                None => return util::err(groups::SYNTAX_ERR),
            }
        }
        _ => return util::err(groups::SYNTAX_ERR),
    };
    if handle.set(key, value, ttl_ms).is_err() {
        return util::err(groups::SET_FAILED);
    }
    con.write_response(groups::OK).await?;
    Ok(())
}
