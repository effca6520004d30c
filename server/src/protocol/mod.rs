/*
 * Created on Sat Feb 21 2026
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

//! # The protocol module
//!
//! This module provides the deserialization primitives for the wire protocol.
//! Requests are arrays of bulk strings; responses additionally use simple
//! strings, errors, integers and nulls. The parser is a plain scanning parser
//! over a byte slice: it either yields a whole frame together with the exact
//! number of bytes it consumed, or reports that the buffer is incomplete so
//! that the caller retains the bytes and retries after the next read.
//!
//! The consumed-byte count is not an implementation detail: replication
//! propagates the *raw* request bytes verbatim and both sides of a
//! replication link account offsets in exact frame lengths.

pub mod responses;

use bytes::Bytes;

/// A whole frame as defined by the wire protocol
#[derive(Debug, PartialEq)]
pub enum Element {
    /// A `+...` simple string
    Simple(String),
    /// A `-...` error string
    Error(String),
    /// A `:...` signed integer
    Integer(i64),
    /// A `$<len>` bulk string
    Bulk(Bytes),
    /// A `$-1` (or `*-1`) null
    Null,
    /// A `*<n>` array of frames
    Array(Vec<Element>),
}

/// A parsed request: the elements of an array of bulk strings
#[derive(Debug, PartialEq)]
pub struct Query {
    data: Vec<Bytes>,
}

impl Query {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn get(&self, idx: usize) -> Option<&Bytes> {
        self.data.get(idx)
    }
    pub fn into_elements(self) -> Vec<Bytes> {
        self.data
    }
    #[cfg(test)]
    pub fn from_elements(data: Vec<Bytes>) -> Self {
        Query { data }
    }
}

#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// More data is needed before the frame can be parsed. This is not an
    /// error: the caller keeps the bytes buffered and retries later
    Incomplete,
    /// The data is corrupted; the connection is beyond recovery
    BadPacket,
}

/// Outcome of parsing a request from the connection buffer
#[derive(Debug, PartialEq)]
pub enum ParseResult {
    /// A successfully parsed query
    ///
    /// The second field is the number of bytes to discard from the buffer as
    /// they have been consumed by this query
    Query(Query, usize),
    /// The buffer does not yet hold a whole request
    Incomplete,
    /// The buffer holds garbage; the connection should be closed
    BadPacket,
}

/// Parse one request frame from the head of `buf`
///
/// A request must be an array whose elements are all bulk strings with at
/// least one element; everything else is a protocol violation
pub fn parse_query(buf: &[u8]) -> ParseResult {
    let mut parser = RawParser::new(buf);
    let element = match parser.element() {
        Ok(e) => e,
        Err(ParseError::Incomplete) => return ParseResult::Incomplete,
        Err(ParseError::BadPacket) => return ParseResult::BadPacket,
    };
    let items = match element {
        Element::Array(items) => items,
        _ => return ParseResult::BadPacket,
    };
    if items.is_empty() {
        return ParseResult::BadPacket;
    }
    let mut data = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Element::Bulk(blob) => data.push(blob),
            _ => return ParseResult::BadPacket,
        }
    }
    ParseResult::Query(Query { data }, parser.cursor)
}

/// Parse one `+...\r\n` (or `-...\r\n`) status line from the head of `buf`,
/// returning the line body and the bytes consumed. Used by the replica side
/// of the handshake where the primary answers in bare status lines
pub fn parse_status_line(buf: &[u8]) -> Result<(String, usize), ParseError> {
    let mut parser = RawParser::new(buf);
    match parser.element()? {
        Element::Simple(line) => Ok((line, parser.cursor)),
        Element::Error(line) => {
            log::error!("Peer answered with an error during handshake: {line}");
            Err(ParseError::BadPacket)
        }
        _ => Err(ParseError::BadPacket),
    }
}

/// Parse a `$<len>\r\n` raw payload header from the head of `buf`
///
/// Unlike a bulk string, the payload that follows this header carries no
/// trailing `\r\n`. This form is only used for the snapshot body during
/// replica bootstrap. Returns `(payload_len, header_len)`
pub fn parse_payload_header(buf: &[u8]) -> Result<(usize, usize), ParseError> {
    let mut parser = RawParser::new(buf);
    if parser.read_byte()? != b'$' {
        return Err(ParseError::BadPacket);
    }
    let line = parser.read_line()?;
    let len = parse_decimal(line)?;
    if len < 0 {
        return Err(ParseError::BadPacket);
    }
    Ok((len as usize, parser.cursor))
}

/// Encode a command as an array of bulk strings, the only request shape the
/// protocol has. The replica side of the handshake uses this
pub fn encode_command(parts: &[&[u8]]) -> Vec<u8> {
    let mut frame = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        frame.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        frame.extend_from_slice(part);
        frame.extend_from_slice(b"\r\n");
    }
    frame
}

/// The scanning parser. `cursor` never runs past the bytes a successfully
/// returned frame occupies, so the caller can advance its buffer by exactly
/// `cursor` bytes
struct RawParser<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> RawParser<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }
    fn read_byte(&mut self) -> Result<u8, ParseError> {
        match self.buf.get(self.cursor) {
            Some(byte) => {
                self.cursor += 1;
                Ok(*byte)
            }
            None => Err(ParseError::Incomplete),
        }
    }
    /// Read up to (but not including) the next `\r\n`, consuming the terminator
    fn read_line(&mut self) -> Result<&'a [u8], ParseError> {
        let start = self.cursor;
        let mut pos = start;
        loop {
            match self.buf.get(pos) {
                Some(b'\r') => break,
                Some(_) => pos += 1,
                None => return Err(ParseError::Incomplete),
            }
        }
        match self.buf.get(pos + 1) {
            Some(b'\n') => {
                self.cursor = pos + 2;
                Ok(&self.buf[start..pos])
            }
            Some(_) => Err(ParseError::BadPacket),
            None => Err(ParseError::Incomplete),
        }
    }
    fn read_exact(&mut self, count: usize) -> Result<&'a [u8], ParseError> {
        match self.buf.get(self.cursor..self.cursor + count) {
            Some(chunk) => {
                self.cursor += count;
                Ok(chunk)
            }
            None => Err(ParseError::Incomplete),
        }
    }
    fn expect_crlf(&mut self) -> Result<(), ParseError> {
        let chunk = self.read_exact(2)?;
        if chunk == &b"\r\n"[..] {
            Ok(())
        } else {
            Err(ParseError::BadPacket)
        }
    }
    /// Parse one whole frame
    fn element(&mut self) -> Result<Element, ParseError> {
        let tsymbol = self.read_byte()?;
        match tsymbol {
            b'+' => {
                let line = self.read_line()?;
                match core::str::from_utf8(line) {
                    Ok(s) => Ok(Element::Simple(s.to_owned())),
                    Err(_) => Err(ParseError::BadPacket),
                }
            }
            b'-' => {
                let line = self.read_line()?;
                match core::str::from_utf8(line) {
                    Ok(s) => Ok(Element::Error(s.to_owned())),
                    Err(_) => Err(ParseError::BadPacket),
                }
            }
            b':' => {
                let line = self.read_line()?;
                Ok(Element::Integer(parse_decimal(line)?))
            }
            b'$' => {
                let line = self.read_line()?;
                let len = parse_decimal(line)?;
                if len < 0 {
                    // a negative length is the null bulk
                    return Ok(Element::Null);
                }
                let payload = self.read_exact(len as usize)?;
                self.expect_crlf()?;
                Ok(Element::Bulk(Bytes::copy_from_slice(payload)))
            }
            b'*' => {
                let line = self.read_line()?;
                let count = parse_decimal(line)?;
                if count < 0 {
                    return Ok(Element::Null);
                }
                // don't trust the header for the allocation; elements that
                // aren't actually there surface as Incomplete anyway
                let mut items = Vec::with_capacity((count as usize).min(64));
                for _ in 0..count {
                    items.push(self.element()?);
                }
                Ok(Element::Array(items))
            }
            _ => Err(ParseError::BadPacket),
        }
    }
}

/// Parse an ASCII decimal, with an optional leading `-`
fn parse_decimal(line: &[u8]) -> Result<i64, ParseError> {
    let (digits, sign) = match line.first() {
        Some(b'-') => (&line[1..], -1),
        Some(_) => (line, 1),
        None => return Err(ParseError::BadPacket),
    };
    if digits.is_empty() {
        return Err(ParseError::BadPacket);
    }
    let mut value: i64 = 0;
    for byte in digits {
        let digit = match byte.checked_sub(b'0') {
            Some(d) if d <= 9 => i64::from(d),
            _ => return Err(ParseError::BadPacket),
        };
        value = match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(v) => v,
            None => return Err(ParseError::BadPacket),
        };
    }
    Ok(sign * value)
}

#[cfg(test)]
pub fn parse_element(buf: &[u8]) -> Result<(Element, usize), ParseError> {
    let mut parser = RawParser::new(buf);
    let element = parser.element()?;
    Ok((element, parser.cursor))
}
