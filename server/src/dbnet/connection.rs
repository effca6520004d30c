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

//! # Buffered protocol connections
//!
//! A [`Connection`] pairs a buffered socket with a residual read buffer.
//! Reads land in the buffer; the framer is asked for a whole request and, if
//! the bytes on hand don't form one yet, they simply stay put until the next
//! read. A parsed request is *not* consumed implicitly: the caller advances
//! the buffer by the reported frame length once it is done with the raw
//! bytes (replication propagates them verbatim).
//!
//! A connection can be muted. While muted, response writes are dropped on
//! the floor; this is how a replica executes upstream commands without
//! answering them.

use crate::protocol::{self, ParseError, ParseResult, Query};
use crate::resp::Writable;
use bytes::{Buf, Bytes, BytesMut};
use libcinder::BUF_CAP;
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// A marker trait for the stream types a [`Connection`] may wrap
pub trait BufferedSocketStream: AsyncReadExt + AsyncWriteExt + Unpin + Send + Sync {}

impl BufferedSocketStream for tokio::net::TcpStream {}

/// Result of [`Connection::read_query`]
#[derive(Debug)]
pub enum QueryResult {
    /// A whole request and the exact byte count it occupies at the head of
    /// the buffer
    Q((Query, usize)),
    /// The peer closed the connection at a frame boundary
    Disconnected,
    /// The peer sent garbage; close without replying
    Violation,
}

pub struct Connection<T> {
    stream: BufWriter<T>,
    buffer: BytesMut,
    muted: bool,
}

impl<T: BufferedSocketStream> Connection<T> {
    pub fn new(stream: T) -> Self {
        Connection {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(BUF_CAP),
            muted: false,
        }
    }

    /// Read until the buffer holds one whole request
    pub async fn read_query(&mut self) -> IoResult<QueryResult> {
        loop {
            match protocol::parse_query(&self.buffer) {
                ParseResult::Query(query, advance) => return Ok(QueryResult::Q((query, advance))),
                ParseResult::BadPacket => return Ok(QueryResult::Violation),
                ParseResult::Incomplete => {
                    if !self.read_again().await? {
                        return if self.buffer.is_empty() {
                            Ok(QueryResult::Disconnected)
                        } else {
                            // the peer left a partial frame behind
                            Err(IoError::from(ErrorKind::ConnectionReset))
                        };
                    }
                }
            }
        }
    }

    /// Pull more bytes off the socket; `false` means EOF
    async fn read_again(&mut self) -> IoResult<bool> {
        Ok(self.stream.read_buf(&mut self.buffer).await? != 0)
    }

    /// Discard `by` bytes from the head of the buffer
    pub fn advance_buffer(&mut self, by: usize) {
        self.buffer.advance(by)
    }

    /// An owned copy of the first `len` buffered bytes: the raw frame of the
    /// request that was just parsed
    pub fn raw_frame(&self, len: usize) -> Bytes {
        Bytes::copy_from_slice(&self.buffer[..len])
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Write a response unless the connection is muted
    pub async fn write_response(&mut self, response: impl Writable) -> IoResult<()> {
        if self.muted {
            return Ok(());
        }
        response.write(&mut self.stream).await
    }

    /// Write the array header (`*<len>\r\n`) for a multi-element response
    pub async fn write_array_length(&mut self, len: usize) -> IoResult<()> {
        if self.muted {
            return Ok(());
        }
        self.stream.write_all(b"*").await?;
        self.stream.write_all(len.to_string().as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        Ok(())
    }

    /// Write raw bytes regardless of muting. Used by the handshake and by
    /// frame propagation, which are not responses
    pub async fn write_raw(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.stream.write_all(bytes).await
    }

    pub async fn flush_stream(&mut self) -> IoResult<()> {
        self.stream.flush().await
    }

    /// Read one `+...\r\n` status line, consuming it. Only used on the
    /// upstream connection during the handshake
    pub async fn read_status_line(&mut self) -> IoResult<String> {
        loop {
            match protocol::parse_status_line(&self.buffer) {
                Ok((line, advance)) => {
                    self.buffer.advance(advance);
                    return Ok(line);
                }
                Err(ParseError::Incomplete) => {
                    if !self.read_again().await? {
                        return Err(IoError::from(ErrorKind::ConnectionReset));
                    }
                }
                Err(ParseError::BadPacket) => return Err(IoError::from(ErrorKind::InvalidData)),
            }
        }
    }

    /// Read a `$<len>\r\n` header plus `len` raw payload bytes (no CRLF
    /// trailer) and throw the payload away, keeping whatever follows it in
    /// the buffer. This is the snapshot body during replica bootstrap; the
    /// first propagated commands may already sit right behind it
    pub async fn consume_raw_payload(&mut self) -> IoResult<usize> {
        let (payload_len, header_len) = loop {
            match protocol::parse_payload_header(&self.buffer) {
                Ok(parsed) => break parsed,
                Err(ParseError::Incomplete) => {
                    if !self.read_again().await? {
                        return Err(IoError::from(ErrorKind::ConnectionReset));
                    }
                }
                Err(ParseError::BadPacket) => return Err(IoError::from(ErrorKind::InvalidData)),
            }
        };
        self.buffer.advance(header_len);
        let mut remaining = payload_len;
        loop {
            let take = remaining.min(self.buffer.len());
            self.buffer.advance(take);
            remaining -= take;
            if remaining == 0 {
                break;
            }
            if !self.read_again().await? {
                return Err(IoError::from(ErrorKind::ConnectionReset));
            }
        }
        Ok(payload_len)
    }
}
