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

//! # `WAIT` queries
//!
//! `WAIT <numreplicas> <timeout_ms>` blocks the issuing client until at
//! least `numreplicas` replicas have acknowledged the primary's offset as it
//! stood when the command was dispatched, or until the timeout passes. The
//! reply is the count of replicas that had acknowledged by then; later
//! writes never raise the bar for an in-flight waiter.
//!
//! The barrier either answers immediately (the count is already there) or
//! broadcasts one `REPLCONF GETACK *` round and polls, never both.

use crate::corestore::{epochms, Corestore};
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::queryengine::ActionIter;
use crate::util;
use std::time::Duration;
use tokio::time;

/// How often a parked `WAIT` rechecks the acknowledgment counts
const SWEEP_INTERVAL_MS: u64 = 100;

/// Run a `WAIT` query
pub async fn wait<T: BufferedSocketStream>(
    handle: &Corestore,
    con: &mut Connection<T>,
    mut act: ActionIter,
) -> super::ActionResult<()> {
    let repl = handle.replication();
    if !repl.is_primary() {
        return util::err(groups::WAIT_IN_REPLICA_MODE);
    }
    let (min_replicas, timeout_ms) = match (act.next(), act.next()) {
        (Some(raw_count), Some(raw_timeout)) => {
            match (
                util::parse_ascii_u64(&raw_count),
                util::parse_ascii_u64(&raw_timeout),
            ) {
                (Some(count), Some(timeout)) => (count as usize, timeout),
                _ => return util::err(groups::SYNTAX_ERR),
            }
        }
        _ => return util::err(groups::WRONG_ARG_COUNT),
    };
    // the bar is the offset at dispatch; concurrent writes don't move it
    let required_offset = repl.master_offset();
    let mut acked = repl.count_acked(required_offset);
    if acked >= min_replicas {
        con.write_response(acked).await?;
        return Ok(());
    }
    // ask every replica to speak up, then poll until the count is reached or
    // the deadline fires. A timeout of 0 waits unbounded
    repl.broadcast_getack();
    let deadline_ms = match timeout_ms {
        0 => None,
        ms => Some(epochms() + ms),
    };
    loop {
        time::sleep(Duration::from_millis(SWEEP_INTERVAL_MS)).await;
        acked = repl.count_acked(required_offset);
        if acked >= min_replicas {
            break;
        }
        if let Some(deadline) = deadline_ms {
            if epochms() >= deadline {
                break;
            }
        }
    }
    con.write_response(acked).await?;
    Ok(())
}
