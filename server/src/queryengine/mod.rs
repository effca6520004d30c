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

//! # The query engine
//!
//! Validates a parsed request against the command table (name, arity) and
//! routes it to its action. The dispatcher also owns the two replication
//! policies that cut across every command:
//!
//! - a write executed on a primary is propagated verbatim to every
//!   registered replica after it succeeds
//! - a command arriving on the upstream link of a replica runs muted, unless
//!   the command is flagged reply-to-upstream (`REPLCONF`, `INFO`)

use crate::actions::{self, ActionResult};
use crate::corestore::Corestore;
use crate::dbnet::connection::{BufferedSocketStream, Connection};
use crate::protocol::responses::groups;
use crate::protocol::Query;
use crate::util;
use bytes::Bytes;

/// Where a request came in from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnOrigin {
    /// An ordinary client connection
    Client,
    /// The upstream link of a replica, carrying propagated commands
    Upstream,
}

/// What the connection should turn into after this command
#[derive(Debug, PartialEq)]
pub enum PostAction {
    Nothing,
    /// The command was a completed `PSYNC`: the connection stops being a
    /// client and becomes a replica sink
    BecomeReplica,
}

/// The arguments of an action, in order, with the command name stripped
pub struct ActionIter {
    inner: std::vec::IntoIter<Bytes>,
}

impl Iterator for ActionIter {
    type Item = Bytes;
    fn next(&mut self) -> Option<Bytes> {
        self.inner.next()
    }
}

mod tags {
    //! Command name tags used to evaluate queries
    pub const TAG_PING: &str = "PING";
    pub const TAG_ECHO: &str = "ECHO";
    pub const TAG_SET: &str = "SET";
    pub const TAG_GET: &str = "GET";
    pub const TAG_DEL: &str = "DEL";
    pub const TAG_KEYS: &str = "KEYS";
    pub const TAG_CONFIG: &str = "CONFIG";
    pub const TAG_INFO: &str = "INFO";
    pub const TAG_REPLCONF: &str = "REPLCONF";
    pub const TAG_PSYNC: &str = "PSYNC";
    pub const TAG_WAIT: &str = "WAIT";
}

/// One row of the command table. Arities count the command name itself
struct CommandSpec {
    min_args: usize,
    max_args: usize,
    is_write: bool,
    reply_to_upstream: bool,
}

const fn cmd(min_args: usize, max_args: usize) -> CommandSpec {
    CommandSpec {
        min_args,
        max_args,
        is_write: false,
        reply_to_upstream: false,
    }
}
const fn write_cmd(min_args: usize, max_args: usize) -> CommandSpec {
    CommandSpec {
        min_args,
        max_args,
        is_write: true,
        reply_to_upstream: false,
    }
}
const fn upstream_cmd(min_args: usize, max_args: usize) -> CommandSpec {
    CommandSpec {
        min_args,
        max_args,
        is_write: false,
        reply_to_upstream: true,
    }
}

fn lookup(name: &str) -> Option<CommandSpec> {
    let spec = match name {
        tags::TAG_PING => cmd(1, 1),
        tags::TAG_ECHO => cmd(2, 2),
        tags::TAG_SET => write_cmd(3, 5),
        tags::TAG_GET => cmd(2, 2),
        tags::TAG_DEL => write_cmd(2, 2),
        tags::TAG_KEYS => cmd(2, 2),
        tags::TAG_CONFIG => cmd(3, 3),
        tags::TAG_INFO => upstream_cmd(2, 2),
        tags::TAG_REPLCONF => upstream_cmd(3, 10),
        tags::TAG_PSYNC => cmd(3, 3),
        tags::TAG_WAIT => cmd(3, 3),
        _ => return None,
    };
    Some(spec)
}

/// Execute one validated request against the store
///
/// `raw_frame` is the request exactly as it came off the wire; for a
/// propagated write those bytes go to the replicas untouched
pub async fn execute<T: BufferedSocketStream>(
    db: &Corestore,
    con: &mut Connection<T>,
    query: Query,
    raw_frame: Bytes,
    origin: ConnOrigin,
) -> ActionResult<PostAction> {
    let argc = query.len();
    let mut parts = query.into_elements().into_iter();
    let name_blob = match parts.next() {
        Some(blob) => blob,
        None => return util::err(groups::UNKNOWN_COMMAND),
    };
    let name = String::from_utf8_lossy(&name_blob).to_ascii_uppercase();
    let spec = lookup(&name);
    if origin == ConnOrigin::Upstream {
        // propagated commands run silent unless flagged reply-to-upstream
        let audible = spec.as_ref().map(|s| s.reply_to_upstream).unwrap_or(false);
        con.set_muted(!audible);
    }
    let spec = match spec {
        Some(spec) => spec,
        None => {
            log::debug!("Unknown command: {name}");
            return util::err(groups::UNKNOWN_COMMAND);
        }
    };
    if argc < spec.min_args || argc > spec.max_args {
        return util::err(groups::WRONG_ARG_COUNT);
    }
    let act = ActionIter { inner: parts };
    match name.as_str() {
        tags::TAG_PING => actions::ping::ping(db, con, act).await?,
        tags::TAG_ECHO => actions::echo::echo(db, con, act).await?,
        tags::TAG_SET => actions::set::set(db, con, act).await?,
        tags::TAG_GET => actions::get::get(db, con, act).await?,
        tags::TAG_DEL => actions::del::del(db, con, act).await?,
        tags::TAG_KEYS => actions::keys::keys(db, con, act).await?,
        tags::TAG_CONFIG => actions::cfget::cfget(db, con, act).await?,
        tags::TAG_INFO => actions::info::info(db, con, act).await?,
        tags::TAG_REPLCONF => actions::replconf::replconf(db, con, act).await?,
        tags::TAG_WAIT => actions::wait::wait(db, con, act).await?,
        // PSYNC flips the connection into a replica sink on success
        tags::TAG_PSYNC => return actions::psync::psync(db, con, act).await,
        _ => unreachable!("lookup() accepted a command the dispatch table lacks"),
    }
    if spec.is_write && origin == ConnOrigin::Client && db.replication().is_primary() {
        db.replication().propagate_write(raw_frame);
    }
    Ok(PostAction::Nothing)
}
