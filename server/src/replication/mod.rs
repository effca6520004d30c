/*
 * Created on Sat Mar 14 2026
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

//! # The replication engine
//!
//! Instance-wide replication state lives here. On a primary that is the
//! replica registry: one insertion-ordered record per bootstrapped replica,
//! each carrying an in-order propagation channel and the highest offset that
//! replica has acknowledged. On a replica it is the count of in-band command
//! bytes consumed from the upstream since the snapshot boundary.
//!
//! Propagation is verbatim: the raw request bytes a write command arrived
//! as (exactly the bytes the framer consumed) are fanned out to every
//! registered replica in registry order, and `master_offset` grows by that
//! frame length. Offsets on both ends therefore speak the same unit.

use crate::protocol::responses::GETACK_FRAME;
use bytes::Bytes;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;

pub mod replica;
pub mod sink;

const ORDERING_RELAXED: Ordering = Ordering::Relaxed;

/// The role this instance was started in. It never changes at runtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Primary,
    Replica,
}

/// A registered replica, as seen by the primary
#[derive(Debug)]
pub struct ReplicaHandle {
    id: u64,
    /// In-order propagation channel; the sink task drains it to the socket
    sender: mpsc::UnboundedSender<Bytes>,
    /// The highest offset this replica has acknowledged
    last_ack_offset: Arc<AtomicU64>,
}

/// Instance-wide replication state
#[derive(Debug)]
pub struct Replication {
    role: Role,
    /// The 40-hex replication id generated at startup
    replid: String,
    /// Cumulative bytes of propagated write frames (primary)
    master_offset: AtomicU64,
    /// Registry of bootstrapped replicas, in insertion order (primary)
    replicas: RwLock<Vec<ReplicaHandle>>,
    next_replica_id: AtomicU64,
    /// Bytes of in-band commands consumed since the snapshot boundary (replica)
    processed_from_master: AtomicU64,
    /// Set once the upstream has asked for an ACK; after that the replica
    /// also volunteers ACKs after applying writes (replica)
    ack_reporting_enabled: AtomicBool,
}

impl Replication {
    pub fn new(is_primary: bool) -> Self {
        Replication {
            role: if is_primary { Role::Primary } else { Role::Replica },
            replid: generate_replid(),
            master_offset: AtomicU64::new(0),
            replicas: RwLock::new(Vec::new()),
            next_replica_id: AtomicU64::new(0),
            processed_from_master: AtomicU64::new(0),
            ack_reporting_enabled: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }
    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }
    pub fn replid(&self) -> &str {
        &self.replid
    }
    pub fn master_offset(&self) -> u64 {
        self.master_offset.load(ORDERING_RELAXED)
    }
    pub fn replica_count(&self) -> usize {
        self.replicas.read().len()
    }

    /// Fan a write frame out to every registered replica (in registry order)
    /// and advance the master offset by the frame length. A replica whose
    /// channel has closed is skipped; its sink task deregisters it
    pub fn propagate_write(&self, frame: Bytes) {
        let frame_len = frame.len() as u64;
        {
            let replicas = self.replicas.read();
            for replica in replicas.iter() {
                let _ = replica.sender.send(frame.clone());
            }
        }
        self.master_offset.fetch_add(frame_len, ORDERING_RELAXED);
    }

    /// Ask every replica for a fresh acknowledgment. Goes through the same
    /// channels as writes so it cannot overtake them; it does not count into
    /// the master offset
    pub fn broadcast_getack(&self) {
        let replicas = self.replicas.read();
        for replica in replicas.iter() {
            let _ = replica.sender.send(Bytes::from_static(GETACK_FRAME));
        }
    }

    /// Number of replicas whose acknowledged offset has reached `required`
    pub fn count_acked(&self, required: u64) -> usize {
        self.replicas
            .read()
            .iter()
            .filter(|replica| replica.last_ack_offset.load(ORDERING_RELAXED) >= required)
            .count()
    }

    /// Enter a fresh replica into the registry (its `PSYNC` just completed).
    /// Returns the registry id, the receiving end of the propagation channel
    /// and the shared acknowledgment cell
    pub fn register_replica(&self) -> (u64, mpsc::UnboundedReceiver<Bytes>, Arc<AtomicU64>) {
        let id = self.next_replica_id.fetch_add(1, ORDERING_RELAXED);
        let (sender, receiver) = mpsc::unbounded_channel();
        let last_ack_offset = Arc::new(AtomicU64::new(0));
        self.replicas.write().push(ReplicaHandle {
            id,
            sender,
            last_ack_offset: last_ack_offset.clone(),
        });
        log::info!("Replica {id} completed its handshake");
        (id, receiver, last_ack_offset)
    }

    pub fn deregister_replica(&self, id: u64) {
        self.replicas.write().retain(|replica| replica.id != id);
        log::info!("Replica {id} deregistered");
    }

    // replica-side accounting

    pub fn processed_from_master(&self) -> u64 {
        self.processed_from_master.load(ORDERING_RELAXED)
    }
    /// Account one fully framed in-band command *before* it executes
    pub fn note_processed(&self, frame_len: u64) {
        self.processed_from_master
            .fetch_add(frame_len, ORDERING_RELAXED);
    }
    pub fn ack_reporting_enabled(&self) -> bool {
        self.ack_reporting_enabled.load(ORDERING_RELAXED)
    }
    pub fn enable_ack_reporting(&self) {
        self.ack_reporting_enabled.store(true, ORDERING_RELAXED);
    }
}

/// 40 hex characters from 20 random bytes
fn generate_replid() -> String {
    let mut raw = [0u8; 20];
    rand::thread_rng().fill(&mut raw);
    let mut replid = String::with_capacity(40);
    for byte in raw {
        replid.push_str(&format!("{byte:02x}"));
    }
    replid
}
