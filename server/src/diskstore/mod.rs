/*
 * Created on Thu Mar 05 2026
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

//! This module provides tools for handling persistently stored data
//!
//! The snapshot is read once at startup to warm the keyspace; the running
//! server never writes it back.

use crate::util::error::{CinderResult, Error};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub mod rdb;

/// Try to get the saved data from disk. A missing snapshot is a fresh start,
/// not an error, so this returns `None` in that case
pub fn get_saved(dir: &str, dbfilename: &str) -> CinderResult<Option<Vec<rdb::Record>>> {
    let path = Path::new(dir).join(dbfilename);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No snapshot found at {}; starting empty", path.display());
            return Ok(None);
        }
        Err(e) => return Err(Error::ioerror_extra(e, format!("reading {}", path.display()))),
    };
    let records = rdb::decode(&raw)?;
    log::info!(
        "Restored {} key(s) from snapshot {}",
        records.len(),
        path.display()
    );
    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use super::get_saved;
    use std::fs;

    #[test]
    fn test_missing_snapshot_is_empty_start() {
        assert!(get_saved("/tmp", "cinder-no-such-file.rdb").unwrap().is_none());
    }

    #[test]
    fn test_snapshot_loads_from_dir_and_filename() {
        let dir = std::env::temp_dir();
        let name = "cinder-diskstore-test.rdb";
        let mut dump = b"REDIS0007".to_vec();
        dump.extend_from_slice(b"\x00\x03foo\x03bar");
        dump.push(0xFF);
        fs::write(dir.join(name), &dump).unwrap();
        let records = get_saved(dir.to_str().unwrap(), name).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].0[..], b"foo");
        fs::remove_file(dir.join(name)).unwrap();
    }
}
