/*
 * Created on Mon Mar 02 2026
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

//! Utilities for generating responses, which are only used by the `server`

use bytes::Bytes;
use std::future::Future;
use std::io::Error as IoError;
use std::pin::Pin;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;

pub type FutureResult<'s, T> = Pin<Box<dyn Future<Output = T> + Send + 's>>;
type FutureIoResult<'s> = FutureResult<'s, Result<(), IoError>>;

/// # The `Writable` trait
/// All trait implementors are given access to an asynchronous stream to which
/// they must write a response.
///
/// Do note that a `write()` **doesn't guarantee immediate completion** as the
/// underlying stream might use buffering; flush before expecting the peer to
/// see anything.
pub trait Writable {
    // traits can't carry async fns, so implementors hand back a boxed future
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s>;
}

pub trait IsConnection: std::marker::Sync + std::marker::Send {
    fn write_lowlevel<'s>(&'s mut self, bytes: &'s [u8]) -> FutureIoResult<'s>;
}

impl<T> IsConnection for T
where
    T: AsyncReadExt + AsyncWriteExt + Unpin + Send + Sync,
{
    fn write_lowlevel<'s>(&'s mut self, bytes: &'s [u8]) -> FutureIoResult<'s> {
        Box::pin(self.write_all(bytes))
    }
}

/// A `BytesWrapper` object wraps around a `Bytes` object that might have been
/// pulled from the corestore. It is written out as a bulk string.
///
/// This wrapper exists to prevent trait implementation conflicts when
/// an impl for `fmt::Display` may be implemented upstream
#[derive(Debug, PartialEq)]
pub struct BytesWrapper(pub Bytes);

impl BytesWrapper {
    pub fn finish_into_bytes(self) -> Bytes {
        self.0
    }
}

/// A `StringWrapper` is written out as a simple string (`+<text>\r\n`)
#[derive(Debug, PartialEq)]
pub struct StringWrapper(pub String);

impl Writable for StringWrapper {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move {
            con.write_lowlevel(&[b'+']).await?;
            con.write_lowlevel(self.0.as_bytes()).await?;
            con.write_lowlevel(b"\r\n").await?;
            Ok(())
        })
    }
}

impl Writable for Vec<u8> {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move { con.write_lowlevel(&self).await })
    }
}

impl Writable for &'static [u8] {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move { con.write_lowlevel(self).await })
    }
}

impl Writable for BytesWrapper {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move {
            // bulk strings carry a length prefix and a CRLF trailer, and the
            // payload in between is 8-bit clean
            let bytes = self.finish_into_bytes();
            con.write_lowlevel(&[b'$']).await?;
            con.write_lowlevel(bytes.len().to_string().as_bytes()).await?;
            con.write_lowlevel(b"\r\n").await?;
            con.write_lowlevel(&bytes).await?;
            con.write_lowlevel(b"\r\n").await?;
            Ok(())
        })
    }
}

impl Writable for usize {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move {
            con.write_lowlevel(b":").await?;
            con.write_lowlevel(self.to_string().as_bytes()).await?;
            con.write_lowlevel(b"\r\n").await?;
            Ok(())
        })
    }
}

impl Writable for u64 {
    fn write<'s>(self, con: &'s mut impl IsConnection) -> FutureIoResult<'s> {
        Box::pin(async move {
            con.write_lowlevel(b":").await?;
            con.write_lowlevel(self.to_string().as_bytes()).await?;
            con.write_lowlevel(b"\r\n").await?;
            Ok(())
        })
    }
}
