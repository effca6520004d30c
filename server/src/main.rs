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

//! # Cinder
//!
//! The `cinderd` crate is Cinder's database server: an in-memory keyspace
//! behind a line-oriented wire protocol, with primary/replica asynchronous
//! replication, snapshot bootstrap and a client-visible replication barrier
//! (`WAIT`). See the modules for their respective documentation.

use crate::config::ConfigSet;
use crate::corestore::Corestore;
use env_logger::Builder;
use libcinder::util::terminal;
use libcinder::{URL, VERSION};
use std::env;
use std::process;
use tokio::signal;

mod actions;
mod config;
mod corestore;
mod dbnet;
mod diskstore;
mod protocol;
mod queryengine;
mod replication;
mod resp;
#[cfg(test)]
mod tests;
mod util;

fn main() {
    Builder::new()
        .parse_filters(&env::var("CINDER_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();
    let cfg = check_args_and_get_cfg();
    println!("Cinder v{} | {}", VERSION, URL);
    // Start the server which asynchronously waits for a CTRL+C signal
    // which will safely shut down the server
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let seed = match diskstore::get_saved(&cfg.dir, &cfg.dbfilename) {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Startup failure: {}", e);
                process::exit(0x100);
            }
        };
        let db = Corestore::new(cfg, seed);
        if let Err(e) = dbnet::run(db, signal::ctrl_c()).await {
            log::error!("Startup failure: {}", e);
            process::exit(0x100);
        }
    });
    log::info!("Stopped accepting incoming connections");
    let _ = terminal::write_info("Goodbye :)\n");
}

/// This function checks the command line arguments and either returns a
/// config object or prints an error to `stderr` and terminates the server
fn check_args_and_get_cfg() -> ConfigSet {
    match config::get_config() {
        Ok(cfg) => {
            if cfg.is_replica() {
                log::info!("Starting in replica mode");
            }
            cfg
        }
        Err(e) => {
            log::error!("{}", e);
            process::exit(0x100);
        }
    }
}
