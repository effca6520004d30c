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

//! # The keyspace table
//!
//! An open-addressed hash table with linear probing, hashed with 64-bit
//! FNV-1a. Capacity is fixed: inserts beyond it are refused with
//! [`TableFull`] and the caller turns that into a protocol-level error.
//! Deletion writes a tombstone so probe chains stay intact; tombstoned slots
//! are reused by later inserts.
//!
//! Every entry may carry an absolute wall-clock deadline in milliseconds
//! (`0` means "never expires"). Expiry is lazy: an entry past its deadline is
//! reaped by the read that finds it.

use bytes::Bytes;

/// Number of slots in the table
pub const DEFAULT_CAPACITY: usize = 32;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// 64-bit FNV-1a over the raw key bytes
fn hash_key(key: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in key {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The insert was refused because every slot holds a live entry
#[derive(Debug, PartialEq)]
pub struct TableFull;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Bytes,
    pub value: Bytes,
    /// Absolute expiry deadline in ms since the epoch; `0` means no expiry
    pub expiry_ms: u64,
}

impl Entry {
    fn has_expired(&self, now_ms: u64) -> bool {
        self.expiry_ms != 0 && self.expiry_ms <= now_ms
    }
}

#[derive(Debug, Clone)]
enum Slot {
    /// Never used; terminates probe chains
    Vacant,
    /// Used once, then deleted; probe chains continue across it
    Tombstone,
    Occupied(Entry),
}

#[derive(Debug)]
pub struct HTable {
    slots: Vec<Slot>,
    len: usize,
}

impl HTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity != 0);
        HTable {
            slots: vec![Slot::Vacant; capacity],
            len: 0,
        }
    }
    /// The number of live entries (tombstones excluded)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Walk the probe chain of `key`, returning the slot index that holds it
    fn find(&self, key: &[u8]) -> Option<usize> {
        let capacity = self.slots.len();
        let mut idx = (hash_key(key) % capacity as u64) as usize;
        for _ in 0..capacity {
            match &self.slots[idx] {
                Slot::Vacant => return None,
                Slot::Tombstone => {}
                Slot::Occupied(entry) => {
                    if entry.key.as_ref() == key {
                        return Some(idx);
                    }
                }
            }
            idx = (idx + 1) % capacity;
        }
        None
    }

    /// Look up `key`, reaping it on the spot if its deadline has passed
    pub fn get(&mut self, key: &[u8], now_ms: u64) -> Option<Bytes> {
        let idx = self.find(key)?;
        let expired = match &self.slots[idx] {
            Slot::Occupied(entry) => entry.has_expired(now_ms),
            _ => unreachable!("find() returned a non-occupied slot"),
        };
        if expired {
            self.slots[idx] = Slot::Tombstone;
            self.len -= 1;
            return None;
        }
        match &self.slots[idx] {
            Slot::Occupied(entry) => Some(entry.value.clone()),
            _ => unreachable!("find() returned a non-occupied slot"),
        }
    }

    /// Insert or update `key`. `expiry_ms` is an absolute deadline (`0` for
    /// none). Updates always succeed; a fresh insert needs a free slot
    pub fn set(&mut self, key: Bytes, value: Bytes, expiry_ms: u64) -> Result<(), TableFull> {
        let capacity = self.slots.len();
        let mut idx = (hash_key(&key) % capacity as u64) as usize;
        // the first reusable slot seen along the probe chain; the whole chain
        // still has to be walked in case the key lives further down
        let mut reusable: Option<usize> = None;
        for _ in 0..capacity {
            match &mut self.slots[idx] {
                Slot::Occupied(entry) => {
                    if entry.key == key {
                        entry.value = value;
                        entry.expiry_ms = expiry_ms;
                        return Ok(());
                    }
                }
                Slot::Tombstone => {
                    if reusable.is_none() {
                        reusable = Some(idx);
                    }
                }
                Slot::Vacant => {
                    if reusable.is_none() {
                        reusable = Some(idx);
                    }
                    break;
                }
            }
            idx = (idx + 1) % capacity;
        }
        match reusable {
            Some(slot) => {
                self.slots[slot] = Slot::Occupied(Entry {
                    key,
                    value,
                    expiry_ms,
                });
                self.len += 1;
                Ok(())
            }
            None => Err(TableFull),
        }
    }

    /// Remove `key` if present, leaving a tombstone behind
    pub fn del(&mut self, key: &[u8]) -> bool {
        match self.find(key) {
            Some(idx) => {
                self.slots[idx] = Slot::Tombstone;
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Every live key in arbitrary order. Entries past their deadline are
    /// skipped (but not reaped; the next `get` does that)
    pub fn keys(&self, now_ms: u64) -> Vec<Bytes> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Occupied(entry) if !entry.has_expired(now_ms) => Some(entry.key.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{HTable, TableFull, DEFAULT_CAPACITY};
    use bytes::Bytes;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut table = HTable::new();
        table.set(b("foo"), b("bar"), 0).unwrap();
        assert_eq!(table.get(b"foo", 100), Some(b("bar")));
        assert_eq!(table.get(b"unknown", 100), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut table = HTable::new();
        table.set(b("k"), b("v1"), 0).unwrap();
        table.set(b("k"), b("v2"), 0).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(b"k", 0), Some(b("v2")));
    }

    #[test]
    fn test_delete_and_reuse() {
        let mut table = HTable::new();
        table.set(b("a"), b("1"), 0).unwrap();
        assert!(table.del(b"a"));
        assert!(!table.del(b"a"));
        assert_eq!(table.get(b"a", 0), None);
        assert_eq!(table.len(), 0);
        // the tombstone is reusable
        table.set(b("b"), b("2"), 0).unwrap();
        assert_eq!(table.get(b"b", 0), Some(b("2")));
    }

    #[test]
    fn test_lazy_expiry_on_get() {
        let mut table = HTable::new();
        table.set(b("k"), b("v"), 1_000).unwrap();
        // before the deadline the entry is alive
        assert_eq!(table.get(b"k", 999), Some(b("v")));
        // at/after the deadline the read reaps it
        assert_eq!(table.get(b"k", 1_000), None);
        assert_eq!(table.len(), 0);
        assert!(table.keys(1_000).is_empty());
    }

    #[test]
    fn test_keys_skips_expired_entries() {
        let mut table = HTable::new();
        table.set(b("left"), b("1"), 0).unwrap();
        table.set(b("gone"), b("2"), 500).unwrap();
        let keys = table.keys(1_000);
        assert_eq!(keys, vec![b("left")]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut table = HTable::new();
        for i in 0..DEFAULT_CAPACITY {
            table.set(b(&format!("key-{i}")), b("v"), 0).unwrap();
        }
        assert_eq!(
            table.set(b("straw"), b("camel"), 0),
            Err(TableFull)
        );
        // updates still work at capacity
        table.set(b("key-0"), b("fresh"), 0).unwrap();
        assert_eq!(table.get(b"key-0", 0), Some(b("fresh")));
        // and deleting one entry frees a slot
        assert!(table.del(b"key-31"));
        table.set(b("straw"), b("camel"), 0).unwrap();
        assert_eq!(table.get(b"straw", 0), Some(b("camel")));
    }

    #[test]
    fn test_probe_chains_survive_deletes() {
        // fill a good part of the table so several keys share probe chains,
        // then delete every other key and verify the rest stay reachable
        let mut table = HTable::new();
        for i in 0..24 {
            table.set(b(&format!("entry/{i}")), b(&format!("{i}")), 0).unwrap();
        }
        for i in (0..24).step_by(2) {
            assert!(table.del(format!("entry/{i}").as_bytes()));
        }
        for i in (1..24).step_by(2) {
            assert_eq!(
                table.get(format!("entry/{i}").as_bytes(), 0),
                Some(b(&format!("{i}"))),
                "entry/{i} lost after neighboring deletes"
            );
        }
        assert_eq!(table.len(), 12);
    }
}
