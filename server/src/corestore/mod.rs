/*
 * Created on Wed Feb 25 2026
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

//! # The core in-memory store
//!
//! [`Corestore`] is a cheap-to-clone handle over the shared server state:
//! the keyspace table, the replication state and the startup configuration.
//! Every connection task holds its own clone; the state itself lives behind
//! one atomic reference.

use crate::config::ConfigSet;
use crate::corestore::htable::HTable;
use crate::replication::Replication;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

pub mod htable;

/// Wall-clock milliseconds since the epoch. All expiry deadlines and `WAIT`
/// deadlines are stamped with this clock
pub fn epochms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// A thread-safe handle to the shared server state. Cloning it clones the
/// atomic reference, not the data
#[derive(Debug, Clone)]
pub struct Corestore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub struct Shared {
    /// The keyspace, behind a R/W lock
    table: RwLock<HTable>,
    /// Instance-wide replication state
    replication: Replication,
    /// The validated startup configuration
    cfg: ConfigSet,
}

impl Corestore {
    /// Create the store from the startup configuration and the entries the
    /// snapshot loader produced (absolute expiry stamps pass through as-is)
    pub fn new(cfg: ConfigSet, seed: Vec<(Bytes, Bytes, u64)>) -> Self {
        let mut table = HTable::new();
        for (key, value, expiry_ms) in seed {
            if table.set(key, value, expiry_ms).is_err() {
                log::warn!("The snapshot holds more keys than the keyspace can; dropping the rest");
                break;
            }
        }
        let replication = Replication::new(cfg.replicaof.is_none());
        Corestore {
            shared: Arc::new(Shared {
                table: RwLock::new(table),
                replication,
                cfg,
            }),
        }
    }

    /// Acquire a read lock on the keyspace
    pub fn acquire_read(&self) -> RwLockReadGuard<'_, HTable> {
        self.shared.table.read()
    }
    /// Acquire a write lock on the keyspace
    pub fn acquire_write(&self) -> RwLockWriteGuard<'_, HTable> {
        self.shared.table.write()
    }
    pub fn replication(&self) -> &Replication {
        &self.shared.replication
    }
    pub fn cfg(&self) -> &ConfigSet {
        &self.shared.cfg
    }

    /// Look up a key. Takes the write lock since a read may reap an expired
    /// entry
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.acquire_write().get(key, epochms())
    }
    /// Insert or update a key with an optional *relative* TTL in milliseconds
    pub fn set(&self, key: Bytes, value: Bytes, ttl_ms: Option<u64>) -> Result<(), ()> {
        let expiry_ms = match ttl_ms {
            Some(ms) if ms > 0 => epochms() + ms,
            _ => 0,
        };
        self.acquire_write()
            .set(key, value, expiry_ms)
            .map_err(|_| ())
    }
    pub fn del(&self, key: &[u8]) -> bool {
        self.acquire_write().del(key)
    }
    pub fn keys(&self) -> Vec<Bytes> {
        self.acquire_read().keys(epochms())
    }
}
