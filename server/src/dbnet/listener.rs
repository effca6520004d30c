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

use {
    super::{connection::Connection, ConnectionHandler, NetBackoff, Terminator},
    crate::{
        corestore::Corestore,
        util::error::{CinderResult, Error},
    },
    std::{net::SocketAddr, sync::Arc},
    tokio::{
        io::Result as IoResult,
        net::{TcpListener, TcpStream},
        sync::{broadcast, mpsc, Semaphore},
    },
};

/// The base TCP listener
pub struct BaseListener {
    /// An atomic reference to the shared state
    pub db: Corestore,
    /// The incoming connection listener (binding)
    pub listener: TcpListener,
    /// The maximum number of connections
    pub climit: Arc<Semaphore>,
    /// The shutdown broadcaster
    pub signal: broadcast::Sender<()>,
    // When all `Sender`s are dropped - the `Receiver` gets a `None` value;
    // we send a clone of `terminate_tx` to each handler
    pub terminate_tx: mpsc::Sender<()>,
    pub terminate_rx: mpsc::Receiver<()>,
}

impl BaseListener {
    pub async fn init(
        db: &Corestore,
        host: &str,
        port: u16,
        semaphore: Arc<Semaphore>,
        signal: broadcast::Sender<()>,
    ) -> CinderResult<Self> {
        let (terminate_tx, terminate_rx) = mpsc::channel(1);
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| Error::ioerror_extra(e, format!("binding to port {port}")))?;
        Ok(Self {
            db: db.clone(),
            listener,
            climit: semaphore,
            signal,
            terminate_tx,
            terminate_rx,
        })
    }
    /// The address we actually bound; tests bind port 0
    pub fn local_addr(&self) -> IoResult<SocketAddr> {
        self.listener.local_addr()
    }
    /// Wait for every running connection handler to wind down
    pub async fn release_self(self) {
        let Self {
            mut terminate_rx,
            terminate_tx,
            signal,
            ..
        } = self;
        drop(signal);
        drop(terminate_tx);
        let _ = terminate_rx.recv().await;
    }
}

/// The server listener: accepts connections forever and hands each one to
/// its own [`ConnectionHandler`] task
pub struct Listener {
    pub base: BaseListener,
}

impl Listener {
    pub fn new(base: BaseListener) -> Self {
        Self { base }
    }
    /// Accept one connection, retrying transient failures with backoff
    async fn accept(&mut self) -> IoResult<TcpStream> {
        let backoff = NetBackoff::new();
        loop {
            match self.base.listener.accept().await {
                Ok((stream, _peer)) => return Ok(stream),
                Err(e) if backoff.exhausted() => return Err(e),
                Err(_) => {
                    // transient (ECONNABORTED, EMFILE and friends): sleep it
                    // out and try again
                    backoff.spin().await;
                }
            }
        }
    }
    /// Run the accept loop
    pub async fn run(&mut self) -> IoResult<()> {
        loop {
            // a permit caps the number of live connections. The handler's
            // Drop impl returns it, so forget the guard here rather than
            // carrying it across the spawn
            if let Ok(permit) = self.base.climit.acquire().await {
                permit.forget();
            }
            // an accept that still fails after the backoff must not take the
            // whole server down with it, so no try operator here; skipping
            // the log also keeps a refused-socket storm from flooding it
            let stream = match self.accept().await {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let mut chandle = ConnectionHandler::new(
                self.base.db.clone(),
                Connection::new(stream),
                self.base.climit.clone(),
                Terminator::new(self.base.signal.subscribe()),
                self.base.terminate_tx.clone(),
            );
            tokio::spawn(async move {
                if let Err(e) = chandle.run().await {
                    log::error!("Error: {}", e);
                }
            });
        }
    }
}
