/*
 * Created on Sat Feb 21 2026
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

//! Primitives for generating wire-compatible responses

pub mod groups {
    #![allow(unused)]
    //! # Pre-compiled responses
    //! These are complete frames that can be written to a stream as-is

    /// The `+OK` simple string
    pub const OK: &[u8] = "+OK\r\n".as_bytes();
    /// The `+PONG` simple string
    pub const PONG: &[u8] = "+PONG\r\n".as_bytes();
    /// The null bulk string
    pub const NIL: &[u8] = "$-1\r\n".as_bytes();
    /// Integer one; `DEL` always answers this
    pub const ONE: &[u8] = ":1\r\n".as_bytes();
    /// "Unknown command" error
    pub const UNKNOWN_COMMAND: &[u8] = "-ERR unknown command\r\n".as_bytes();
    /// Arity violation error
    pub const WRONG_ARG_COUNT: &[u8] = "-ERR wrong number of arguments\r\n".as_bytes();
    /// The keyspace refused the insert (capacity or allocation failure)
    pub const SET_FAILED: &[u8] = "-ERR failed to set key\r\n".as_bytes();
    /// A malformed option to an otherwise well-formed command
    pub const SYNTAX_ERR: &[u8] = "-ERR syntax error\r\n".as_bytes();
    /// `CONFIG GET` for a parameter we don't expose
    pub const UNKNOWN_CONFIG_PARAMETER: &[u8] = "-ERR Unknown CONFIG parameter\r\n".as_bytes();
    /// A `REPLCONF` subcommand outside the replication vocabulary
    pub const UNKNOWN_REPLCONF_COMMAND: &[u8] = "-ERR Unknown REPLCONF command\r\n".as_bytes();
    /// `WAIT` issued against a replica
    pub const WAIT_IN_REPLICA_MODE: &[u8] = "-ERR WAIT not supported in slave mode\r\n".as_bytes();
    /// `PSYNC` issued against a replica
    pub const PSYNC_IN_REPLICA_MODE: &[u8] = "-ERR PSYNC not supported in slave mode\r\n".as_bytes();
}

/// The `REPLCONF GETACK *` frame the primary broadcasts when a `WAIT` needs
/// fresh acknowledgments
pub const GETACK_FRAME: &[u8] = "*3\r\n$8\r\nREPLCONF\r\n$6\r\nGETACK\r\n$1\r\n*\r\n".as_bytes();
