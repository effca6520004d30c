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

//! # The snapshot decoder
//!
//! Decodes the binary dump format the server reads at cold start. Only the
//! subset the server itself produces and consumes is supported:
//!
//! - a 9-byte header (5-byte magic plus 4 ASCII version digits), skipped
//! - `0xFA` metadata pairs, parsed and discarded
//! - `0xFE` database selector with its `0xFB` hash-size hints, discarded
//! - string records, optionally prefixed by `0xFC` (ms expiry, u64 LE) or
//!   `0xFD` (seconds expiry, u32 LE, widened to ms)
//! - `0xFF` end-of-file (anything after it, e.g. a checksum, is ignored)
//!
//! LZF-compressed strings (`0xC3`) are not supported and abort the load.

use crate::util::error::{CinderResult, Error};
use bytes::Bytes;

/// The 9-byte header: magic + version digits
const HEADER_LEN: usize = 9;

/// The smallest valid dump: a header followed by end-of-file. This is what
/// the primary ships to a bootstrapping replica
pub const EMPTY_SNAPSHOT: &[u8] = b"REDIS0007\xff";

/// A decoded record: key, value, absolute expiry in ms (`0` for none)
pub type Record = (Bytes, Bytes, u64);

/// Decode a whole dump held in memory
pub fn decode(buf: &[u8]) -> CinderResult<Vec<Record>> {
    let mut reader = Reader::new(buf);
    reader.skip(HEADER_LEN)?;
    let mut records = Vec::new();
    loop {
        match reader.read_byte()? {
            0xFA => {
                // metadata attribute: name and value, both string encoded
                let name = reader.read_string()?;
                let value = reader.read_string()?;
                log::debug!(
                    "Snapshot metadata: {} = {}",
                    String::from_utf8_lossy(&name),
                    String::from_utf8_lossy(&value)
                );
            }
            0xFE => {
                let db_index = reader.read_size()?;
                if reader.read_byte()? != 0xFB {
                    return Err(Error::Snapshot(
                        "expected hash table size information after the database selector".into(),
                    ));
                }
                let table_size = reader.read_size()?;
                let expires_size = reader.read_size()?;
                log::debug!(
                    "Snapshot database {db_index}: {table_size} keys, {expires_size} with expiry"
                );
            }
            0x00 => {
                let key = reader.read_string()?;
                let value = reader.read_string()?;
                records.push((key, value, 0));
            }
            0xFC => {
                let expiry_ms = u64::from_le_bytes(reader.read_array::<8>()?);
                reader.expect_string_type()?;
                let key = reader.read_string()?;
                let value = reader.read_string()?;
                records.push((key, value, expiry_ms));
            }
            0xFD => {
                let expiry_s = u32::from_le_bytes(reader.read_array::<4>()?);
                reader.expect_string_type()?;
                let key = reader.read_string()?;
                let value = reader.read_string()?;
                records.push((key, value, u64::from(expiry_s) * 1000));
            }
            0xFF => break,
            opcode => {
                return Err(Error::Snapshot(format!(
                    "unknown opcode 0x{opcode:02X} in snapshot"
                )))
            }
        }
    }
    Ok(records)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }
    fn skip(&mut self, count: usize) -> CinderResult<()> {
        if self.buf.len() < self.pos + count {
            return Err(truncated());
        }
        self.pos += count;
        Ok(())
    }
    fn read_byte(&mut self) -> CinderResult<u8> {
        match self.buf.get(self.pos) {
            Some(byte) => {
                self.pos += 1;
                Ok(*byte)
            }
            None => Err(truncated()),
        }
    }
    fn read_array<const N: usize>(&mut self) -> CinderResult<[u8; N]> {
        match self.buf.get(self.pos..self.pos + N) {
            Some(chunk) => {
                self.pos += N;
                let mut array = [0u8; N];
                array.copy_from_slice(chunk);
                Ok(array)
            }
            None => Err(truncated()),
        }
    }
    fn read_bytes(&mut self, count: usize) -> CinderResult<&'a [u8]> {
        match self.buf.get(self.pos..self.pos + count) {
            Some(chunk) => {
                self.pos += count;
                Ok(chunk)
            }
            None => Err(truncated()),
        }
    }
    /// Only string records are supported; anything else aborts the load
    fn expect_string_type(&mut self) -> CinderResult<()> {
        match self.read_byte()? {
            0x00 => Ok(()),
            vtype => Err(Error::Snapshot(format!(
                "unsupported value type 0x{vtype:02X}"
            ))),
        }
    }
    /// A size-encoded unsigned integer: the two leading bits select the width
    fn read_size(&mut self) -> CinderResult<u64> {
        let first = self.read_byte()?;
        match first >> 6 {
            0b00 => Ok(u64::from(first & 0x3F)),
            0b01 => {
                let second = self.read_byte()?;
                Ok((u64::from(first & 0x3F) << 8) | u64::from(second))
            }
            0b10 => Ok(u64::from(u32::from_be_bytes(self.read_array::<4>()?))),
            _ => Err(Error::Snapshot(
                "special-form marker where a plain size was expected".into(),
            )),
        }
    }
    /// A string: either a size-prefixed run of raw bytes, or one of the
    /// integers-as-string special forms
    fn read_string(&mut self) -> CinderResult<Bytes> {
        let first = match self.buf.get(self.pos) {
            Some(byte) => *byte,
            None => return Err(truncated()),
        };
        if first >> 6 == 0b11 {
            self.pos += 1;
            let rendered = match first {
                0xC0 => i64::from(self.read_array::<1>()?[0] as i8).to_string(),
                0xC1 => i64::from(i16::from_le_bytes(self.read_array::<2>()?)).to_string(),
                0xC2 => i64::from(i32::from_le_bytes(self.read_array::<4>()?)).to_string(),
                0xC3 => {
                    return Err(Error::Snapshot(
                        "LZF-compressed strings are not supported".into(),
                    ))
                }
                marker => {
                    return Err(Error::Snapshot(format!(
                        "unknown string encoding 0x{marker:02X}"
                    )))
                }
            };
            return Ok(Bytes::from(rendered.into_bytes()));
        }
        let len = self.read_size()? as usize;
        Ok(Bytes::copy_from_slice(self.read_bytes(len)?))
    }
}

fn truncated() -> Error {
    Error::Snapshot("unexpected end of snapshot data".into())
}
