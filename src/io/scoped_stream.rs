// Sonata
// Copyright (c) 2019 The Sonata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

use crate::errors::{length_mismatch_error, Error, Result};
use super::{Bytestream, FiniteStream};

/// A `ScopedStream` restricts reads to a declared byte length and, on `finish`, reports whether
/// the handler consumed exactly that many bytes.
///
/// Over-reads are rejected as they happen; under-reads are only detectable once the handler
/// returns, so the tag and action dispatchers open a `ScopedStream` around each handler
/// invocation and call `finish` afterward, turning either case into a single
/// `Error::LengthMismatch` rather than silently accepting a short read.
pub struct ScopedStream<B: Bytestream> {
    inner: B,
    name: &'static str,
    offset: u64,
    len: u64,
    read: u64,
}

impl<B: Bytestream> ScopedStream<B> {
    pub fn new(inner: B, name: &'static str, offset: u64, len: u64) -> Self {
        ScopedStream { inner, name, offset, len, read: 0 }
    }

    /// Returns a mutable reference to the inner `Bytestream`.
    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    /// Ignores the remainder of the `ScopedStream`.
    pub fn ignore_remainder(&mut self) -> io::Result<()> {
        let remaining = self.len - self.read;
        self.ignore_bytes(remaining)
    }

    /// Checks that exactly `len` bytes were consumed and returns the inner `Bytestream`.
    ///
    /// Returns `Error::LengthMismatch` naming this scope if the handler consumed more or fewer
    /// bytes than declared.
    pub fn finish(self) -> Result<B> {
        if self.read != self.len {
            return length_mismatch_error(self.name, self.offset, self.len, self.read);
        }
        Ok(self.inner)
    }
}

impl<B: Bytestream> FiniteStream for ScopedStream<B> {
    fn byte_len(&self) -> u64 {
        self.len
    }

    fn bytes_read(&self) -> u64 {
        self.read
    }

    fn bytes_available(&self) -> u64 {
        self.len - self.read
    }
}

impl<B: Bytestream> Bytestream for ScopedStream<B> {
    #[inline(always)]
    fn read_byte(&mut self) -> io::Result<u8> {
        if self.len - self.read < 1 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "scope exhausted"));
        }
        self.read += 1;
        self.inner.read_byte()
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]> {
        if self.len - self.read < 2 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "scope exhausted"));
        }
        self.read += 2;
        self.inner.read_double_bytes()
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]> {
        if self.len - self.read < 4 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "scope exhausted"));
        }
        self.read += 4;
        self.inner.read_quad_bytes()
    }

    fn read_buf_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.len - self.read < buf.len() as u64 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "scope exhausted"));
        }
        self.read += buf.len() as u64;
        self.inner.read_buf_bytes(buf)
    }

    fn ignore_bytes(&mut self, count: u64) -> io::Result<()> {
        if self.len - self.read < count {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "scope exhausted"));
        }
        self.read += count;
        self.inner.ignore_bytes(count)
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        self.inner.pos()
    }

    /// Seeks within the scope's own bounds, rewinding (and adjusting `read` accordingly) so a
    /// failed handler can be recovered as a raw byte run without escaping the declared length.
    /// A target outside `[offset, offset + len]` is rejected.
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        if pos < self.offset || pos > self.offset + self.len {
            return Err(io::Error::new(io::ErrorKind::Other, "seek outside scope bounds"));
        }
        self.inner.seek_to(pos)?;
        self.read = pos - self.offset;
        Ok(())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::io::BufStream;
    use super::*;

    #[test]
    fn exact_consumption_finishes_cleanly() {
        let mut scoped = ScopedStream::new(BufStream::new(&[0x01, 0x02, 0x03]), "Test", 0, 3);
        scoped.read_buf_bytes(&mut [0u8; 3]).unwrap();
        assert!(scoped.finish().is_ok());
    }

    #[test]
    fn under_read_is_reported_on_finish() {
        let mut scoped = ScopedStream::new(BufStream::new(&[0x01, 0x02, 0x03]), "Test", 0, 3);
        scoped.read_byte().unwrap();
        match scoped.finish() {
            Err(Error::LengthMismatch { expected: 3, actual: 1, .. }) => {}
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn over_read_is_rejected_immediately() {
        let mut scoped = ScopedStream::new(BufStream::new(&[0x01, 0x02]), "Test", 0, 1);
        scoped.read_byte().unwrap();
        assert!(scoped.read_byte().is_err());
    }
}
