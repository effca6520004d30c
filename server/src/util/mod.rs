/*
 * Created on Tue Feb 17 2026
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

pub mod error;

use crate::actions::{ActionError, ActionResult};

/// Return an `ActionError` built from a precompiled response
pub fn err<T>(e: &'static [u8]) -> ActionResult<T> {
    Err(ActionError::ActionError(e))
}

/// Parse an unsigned ASCII decimal argument
pub fn parse_ascii_u64(raw: &[u8]) -> Option<u64> {
    core::str::from_utf8(raw).ok()?.parse().ok()
}
