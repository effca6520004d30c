/*
 * Created on Sat Mar 21 2026
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

//! # Database networking
//!
//! The listener accepts connections and every accepted connection runs on a
//! task of its own. Within one connection, requests are read, executed and
//! answered strictly in order; residual bytes between reads stay in the
//! per-connection buffer. A connection that completes a `PSYNC` stops being
//! a request/response client and becomes a replica sink: from then on the
//! task ships propagated frames out and takes acknowledgments in.

use {
    self::connection::{Connection, QueryResult},
    crate::{
        actions::ActionError,
        corestore::Corestore,
        queryengine::{self, ConnOrigin, PostAction},
        replication::{replica, sink},
        util::error::CinderResult,
    },
    std::{future::Future, sync::atomic::{AtomicU8, Ordering}, sync::Arc, time::Duration},
    tokio::{
        io::Result as IoResult,
        sync::{broadcast, mpsc, Semaphore},
        time,
    },
};

pub mod connection;
mod listener;

pub use self::connection::BufferedSocketStream;
pub use self::listener::{BaseListener, Listener};

pub const MAXIMUM_CONNECTION_LIMIT: usize = 50000;

/// A 'listener' for events that may mean the server has to terminate
pub struct Terminator {
    terminate: bool,
    signal: broadcast::Receiver<()>,
}

impl Terminator {
    /// Create a new `Terminator` using a given broadcast receiver
    pub fn new(signal: broadcast::Receiver<()>) -> Self {
        Terminator {
            terminate: false,
            signal,
        }
    }
    /// Wait to receive a shutdown signal
    pub async fn receive_signal(&mut self) {
        if self.terminate {
            return;
        }
        // the sender having gone away counts as a signal too
        let _ = self.signal.recv().await;
        self.terminate = true;
    }
}

/// Exponential backoff for the accept loop: transient accept failures are
/// retried with a doubling delay until the ceiling is crossed
pub(self) struct NetBackoff {
    secs: AtomicU8,
}

impl NetBackoff {
    /// Give up once the next delay would exceed this many seconds
    const CEILING_SECS: u8 = 64;
    pub const fn new() -> Self {
        Self { secs: AtomicU8::new(1) }
    }
    /// Sleep out the current delay and double it for the next round
    pub async fn spin(&self) {
        let current = self.secs.load(Ordering::Relaxed);
        time::sleep(Duration::from_secs(current.into())).await;
        self.secs.store(current << 1, Ordering::Relaxed);
    }
    /// `true` once the retry budget is spent
    pub fn exhausted(&self) -> bool {
        self.secs.load(Ordering::Relaxed) > Self::CEILING_SECS
    }
}

/// A generic connection handler: one per accepted connection
pub struct ConnectionHandler<C> {
    /// an atomic reference to the shared state
    db: Corestore,
    /// the connection
    con: Connection<C>,
    /// the semaphore used to impose limits on number of connections
    climit: Arc<Semaphore>,
    /// check for termination signals
    terminator: Terminator,
    /// the sender that we drop when we're done with handling a connection
    /// (used for graceful exit)
    _term_sig_tx: mpsc::Sender<()>,
}

impl<C: BufferedSocketStream> ConnectionHandler<C> {
    pub fn new(
        db: Corestore,
        con: Connection<C>,
        climit: Arc<Semaphore>,
        terminator: Terminator,
        _term_sig_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            db,
            con,
            climit,
            terminator,
            _term_sig_tx,
        }
    }
    pub async fn run(&mut self) -> IoResult<()> {
        loop {
            let result = tokio::select! {
                result = self.con.read_query() => result,
                _ = self.terminator.receive_signal() => {
                    return Ok(());
                }
            };
            match result? {
                QueryResult::Q((query, advance)) => {
                    // replication needs the frame exactly as it came in, so
                    // copy it out before the buffer moves on
                    let raw_frame = self.con.raw_frame(advance);
                    let outcome =
                        queryengine::execute(&self.db, &mut self.con, query, raw_frame, ConnOrigin::Client)
                            .await;
                    self.con.advance_buffer(advance);
                    match outcome {
                        Ok(PostAction::Nothing) => {}
                        Ok(PostAction::BecomeReplica) => {
                            self.con.flush_stream().await?;
                            return self.run_replica_sink().await;
                        }
                        Err(ActionError::ActionError(e)) => self.con.write_response(e).await?,
                        Err(ActionError::IoError(e)) => return Err(e),
                    }
                    self.con.flush_stream().await?;
                }
                QueryResult::Disconnected => return Ok(()),
                QueryResult::Violation => {
                    // a protocol violation closes the connection, no reply
                    log::debug!("Closing connection after an unparseable frame");
                    return Ok(());
                }
            }
        }
    }

    /// The connection finished a `PSYNC`: register it and pump propagated
    /// frames until either side goes away
    async fn run_replica_sink(&mut self) -> IoResult<()> {
        let (id, mut propagation_rx, last_ack) = self.db.replication().register_replica();
        let result = sink::run(&mut self.con, &mut propagation_rx, &last_ack).await;
        self.db.replication().deregister_replica(id);
        result
    }
}

impl<C> Drop for ConnectionHandler<C> {
    fn drop(&mut self) {
        // Make sure that the permit is returned to the semaphore
        // in the case that there is a panic inside
        self.climit.add_permits(1);
    }
}

/// Bring the networking up: bind, bootstrap replication if configured, then
/// accept until the termination future resolves
pub async fn run(
    db: Corestore,
    termination: impl Future<Output = IoResult<()>>,
) -> CinderResult<()> {
    let climit = Arc::new(Semaphore::new(MAXIMUM_CONNECTION_LIMIT));
    let (signal, _) = broadcast::channel(1);
    let cfg = db.cfg().clone();
    let base = BaseListener::init(&db, "127.0.0.1", cfg.port, climit, signal.clone()).await?;
    log::info!("Server started on 127.0.0.1:{}", cfg.port);

    // a replica completes its handshake before serving anyone; a primary we
    // cannot reach is a startup failure
    if let Some((ref master_host, master_port)) = cfg.replicaof {
        let upstream = replica::bootstrap(&db, master_host, master_port).await?;
        let upstream_db = db.clone();
        tokio::spawn(async move {
            if let Err(e) = replica::stream_commands(upstream_db, upstream).await {
                log::error!("Upstream link failed: {}", e);
            }
        });
    }

    let mut listener = Listener::new(base);
    tokio::select! {
        _ = listener.run() => {}
        _ = termination => {
            log::info!("Termination signal received, winding down");
        }
    }
    drop(signal);
    listener.base.release_self().await;
    Ok(())
}
