/*
 * Created on Fri Mar 06 2026
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

//! Startup configuration
//!
//! Command-line arguments are declared in `cli.yml` and validated here into
//! a [`ConfigSet`]. Validation failures are fatal: the caller logs them and
//! exits non-zero.

// external imports
use clap::{load_yaml, App, ArgMatches};
// std imports
use core::fmt;

// server defaults
const DEFAULT_DIR: &str = ".";
const DEFAULT_DBFILENAME: &str = "dump.rdb";
const DEFAULT_PORT: u16 = 6379;
// the non-privileged port range we accept
const PORT_MIN: u16 = 1024;

/// The validated startup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSet {
    /// Directory that holds the snapshot file
    pub dir: String,
    /// Name of the snapshot file within `dir`
    pub dbfilename: String,
    /// The TCP port to listen on
    pub port: u16,
    /// When set, this instance runs as a replica of `(host, port)`
    pub replicaof: Option<(String, u16)>,
}

impl Default for ConfigSet {
    fn default() -> Self {
        ConfigSet {
            dir: DEFAULT_DIR.to_owned(),
            dbfilename: DEFAULT_DBFILENAME.to_owned(),
            port: DEFAULT_PORT,
            replicaof: None,
        }
    }
}

impl ConfigSet {
    pub fn is_replica(&self) -> bool {
        self.replicaof.is_some()
    }
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    BadPort(String),
    BadReplicaOf(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPort(raw) => write!(
                f,
                "Invalid `--port` value '{raw}': expected an integer in the {PORT_MIN}-65535 range"
            ),
            Self::BadReplicaOf(raw) => write!(
                f,
                "Invalid `--replicaof` value '{raw}': expected \"<host> <port>\""
            ),
        }
    }
}

/// Parse the command line into a validated configuration
pub fn get_config() -> Result<ConfigSet, ConfigError> {
    let layout = load_yaml!("../cli.yml");
    let matches = App::from_yaml(layout).get_matches();
    parse_matches(&matches)
}

fn parse_matches(matches: &ArgMatches) -> Result<ConfigSet, ConfigError> {
    let mut cfg = ConfigSet::default();
    if let Some(dir) = matches.value_of("dir") {
        cfg.dir = dir.to_owned();
    }
    if let Some(dbfilename) = matches.value_of("dbfilename") {
        cfg.dbfilename = dbfilename.to_owned();
    }
    if let Some(port) = matches.value_of("port") {
        cfg.port = parse_port(port)?;
    }
    if let Some(replicaof) = matches.value_of("replicaof") {
        cfg.replicaof = Some(parse_replicaof(replicaof)?);
    }
    Ok(cfg)
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port >= PORT_MIN => Ok(port),
        _ => Err(ConfigError::BadPort(raw.to_owned())),
    }
}

/// `--replicaof` takes a single `"<host> <port>"` argument
fn parse_replicaof(raw: &str) -> Result<(String, u16), ConfigError> {
    let mut parts = raw.split_whitespace();
    let host = match parts.next() {
        Some(host) => host.to_owned(),
        None => return Err(ConfigError::BadReplicaOf(raw.to_owned())),
    };
    let port = match parts.next().map(str::parse::<u16>) {
        Some(Ok(port)) if port != 0 => port,
        _ => return Err(ConfigError::BadReplicaOf(raw.to_owned())),
    };
    if parts.next().is_some() {
        return Err(ConfigError::BadReplicaOf(raw.to_owned()));
    }
    Ok((host, port))
}
