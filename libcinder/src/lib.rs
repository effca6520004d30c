/*
 * Created on Sat Feb 14 2026
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

//! The shared library for Cinder
//!
//! This contains definitions which are shared by the `server` crate and any
//! future tooling crates (benchmarks, migration tools and the like)

pub mod util;

/// The version of this build
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// The project site
pub const URL: &str = "https://github.com/cinder-db/cinder";
/// The size of the per-connection read buffer in bytes
pub const BUF_CAP: usize = 8 * 1024; // 8 KB per-connection
