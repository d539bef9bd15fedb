// Sonata
// Copyright (c) 2019 The Sonata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use byteorder::{ByteOrder, LittleEndian};
use std::io;

mod bit;
mod buf_stream;
mod scoped_stream;

pub use bit::BitConsumer;
pub use buf_stream::BufStream;
pub use scoped_stream::ScopedStream;

/// A `Bytestream` is a seekable, byte-addressable source of little-endian primitive values.
///
/// Every multi-byte read in the SWF format is little-endian, so this trait carries no
/// big-endian counterparts.
pub trait Bytestream {
    /// Reads a single byte from the stream and returns it or an error.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Reads two bytes from the stream and returns them in read-order or an error.
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]>;

    /// Reads four bytes from the stream and returns them in read-order or an error.
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]>;

    /// Reads exactly the number of bytes required to fill the provided buffer or returns an error.
    fn read_buf_bytes(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Ignores the specified number of bytes from the stream or returns an error.
    fn ignore_bytes(&mut self, count: u64) -> io::Result<()>;

    /// Returns the current byte offset into the stream.
    fn pos(&self) -> u64;

    /// Seeks to an absolute byte offset from the start of the stream.
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;

    /// Reads a single unsigned byte from the stream and returns it or an error.
    #[inline(always)]
    fn read_u8(&mut self) -> io::Result<u8> {
        self.read_byte()
    }

    /// Reads a single signed byte from the stream and returns it or an error.
    #[inline(always)]
    fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_byte()? as i8)
    }

    /// Reads two bytes from the stream and interprets them as an unsigned 16-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads two bytes from the stream and interprets them as a signed 16-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_i16(&mut self) -> io::Result<i16> {
        Ok(i16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as an unsigned 32-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as a signed 32-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as a 32-bit little-endian IEEE-754
    /// floating point value.
    #[inline(always)]
    fn read_f32(&mut self) -> io::Result<f32> {
        Ok(LittleEndian::read_f32(&self.read_quad_bytes()?))
    }

    /// Reads eight bytes from the stream and interprets them as a 64-bit little-endian IEEE-754
    /// floating point value.
    #[inline(always)]
    fn read_f64(&mut self) -> io::Result<f64> {
        let mut buf = [0u8; 8];
        self.read_buf_bytes(&mut buf)?;
        Ok(LittleEndian::read_f64(&buf))
    }

    /// Reads exactly the number of bytes requested and returns them as a `Vec<u8>`.
    fn read_vec_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_buf_bytes(&mut buf)?;
        Ok(buf)
    }
}

impl<'b, B: Bytestream> Bytestream for &'b mut B {
    #[inline(always)]
    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> io::Result<[u8; 2]> {
        (**self).read_double_bytes()
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> io::Result<[u8; 4]> {
        (**self).read_quad_bytes()
    }

    #[inline(always)]
    fn read_buf_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_buf_bytes(buf)
    }

    #[inline(always)]
    fn ignore_bytes(&mut self, count: u64) -> io::Result<()> {
        (**self).ignore_bytes(count)
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        (**self).pos()
    }

    #[inline(always)]
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        (**self).seek_to(pos)
    }
}

/// A `FiniteStream` is a stream that has a definitive length. A `FiniteStream` therefore knows
/// how many bytes are available for reading, or have been previously read.
pub trait FiniteStream {
    /// Returns the length of the stream.
    fn byte_len(&self) -> u64;

    /// Returns the number of bytes read.
    fn bytes_read(&self) -> u64;

    /// Returns the number of bytes available for reading.
    fn bytes_available(&self) -> u64;
}
