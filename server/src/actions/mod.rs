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

//! # Actions
//!
//! Actions are like shell commands: you provide arguments, they write a
//! response. One module per action; the dispatcher in `queryengine` has
//! already validated the arity by the time an action runs.

pub mod cfget;
pub mod del;
pub mod echo;
pub mod get;
pub mod info;
pub mod keys;
pub mod psync;
pub mod replconf;
pub mod set;
pub mod wait;

use std::io::Error as IoError;

/// A generic result for actions
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while running actions
///
/// A protocol-visible error travels as precompiled response bytes; transport
/// errors tear the connection down instead
#[derive(Debug)]
pub enum ActionError {
    ActionError(&'static [u8]),
    IoError(IoError),
}

impl From<&'static [u8]> for ActionError {
    fn from(e: &'static [u8]) -> Self {
        Self::ActionError(e)
    }
}

impl From<IoError> for ActionError {
    fn from(e: IoError) -> Self {
        Self::IoError(e)
    }
}

pub mod ping {
    //! Respond to `PING` queries
    use super::ActionResult;
    use crate::corestore::Corestore;
    use crate::dbnet::connection::{BufferedSocketStream, Connection};
    use crate::protocol::responses::groups;
    use crate::queryengine::ActionIter;

    pub async fn ping<T: BufferedSocketStream>(
        _handle: &Corestore,
        con: &mut Connection<T>,
        _act: ActionIter,
    ) -> ActionResult<()> {
        con.write_response(groups::PONG).await?;
        Ok(())
    }
}
