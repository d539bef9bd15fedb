// Sonata
// Copyright (c) 2019 The Sonata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

use crate::util::bits::sign_extend_leq32_to_i32;
use super::Bytestream;

/// A `BitConsumer` reads MSB-first bits from a source `Bytestream`.
///
/// Bit fields in the SWF tag stream are never realigned to a byte boundary on the caller's
/// behalf: each bit-level record (a `RECT`, a shape record, a button-condition flag block) is
/// read with a fresh `BitConsumer` constructed over the stream at the point the record starts,
/// and any partial byte left over when the record ends is simply discarded because the next
/// read resumes at the following byte boundary.
pub struct BitConsumer<B: Bytestream> {
    inner: B,
    bits: u32,
    n_bits_left: u32,
}

impl<B: Bytestream> BitConsumer<B> {
    pub fn new(inner: B) -> BitConsumer<B> {
        BitConsumer { inner, bits: 0, n_bits_left: 0 }
    }

    /// Constructs a `BitConsumer` whose first byte has already been read from `inner` by the
    /// caller (used to peek a terminator byte without an unsupported stream rewind: the caller
    /// reads one byte, and if it isn't the terminator, hands it here instead of seeking back).
    pub fn new_with_byte(inner: B, byte: u8) -> BitConsumer<B> {
        BitConsumer { inner, bits: u32::from(byte), n_bits_left: 8 }
    }

    /// Consumes the `BitConsumer`, returning the inner `Bytestream` positioned just past the
    /// last whole byte that was read to service a bit read. Any bits buffered from a
    /// partially-consumed byte are discarded.
    pub fn into_inner(self) -> B {
        self.inner
    }

    #[inline(always)]
    fn fill(&mut self) -> io::Result<()> {
        self.bits = u32::from(self.inner.read_u8()?);
        self.n_bits_left = 8;
        Ok(())
    }

    /// Reads `num_bits` (0..=32) bits and returns them as an unsigned value, MSB-first.
    pub fn get_unsigned(&mut self, mut num_bits: u32) -> io::Result<u32> {
        debug_assert!(num_bits <= 32);

        if num_bits == 0 {
            return Ok(0);
        }

        // Saved before `num_bits` is consumed below; `self.bits` always holds the whole
        // buffered byte, not just its unread low bits, so the result must be narrowed back
        // down to the width actually requested.
        let mask = ((1u64 << num_bits) - 1) as u32;

        let mut res: u32 = self.bits;

        if num_bits <= self.n_bits_left {
            self.n_bits_left -= num_bits;
            res >>= self.n_bits_left;
        }
        else {
            num_bits -= self.n_bits_left;

            while num_bits >= 8 {
                res <<= 8;
                res |= u32::from(self.inner.read_u8()?);
                num_bits -= 8;
            }

            if num_bits > 0 {
                res <<= num_bits;
                self.fill()?;
                self.n_bits_left -= num_bits;
                res |= self.bits >> self.n_bits_left;
            }
            else {
                self.n_bits_left = 0;
            }
        }

        Ok(res & mask)
    }

    /// Reads `num_bits` bits and interprets them as a signed two's complement integer.
    ///
    /// A width of exactly 1 is a special case in this format: a single bit is read as an
    /// unsigned 0/1 value rather than sign-extended, since a lone sign bit with no magnitude
    /// bits has no meaningful negative representation here.
    pub fn get_signed(&mut self, num_bits: u32) -> io::Result<i32> {
        let value = self.get_unsigned(num_bits)?;

        if num_bits <= 1 {
            Ok(value as i32)
        }
        else {
            Ok(sign_extend_leq32_to_i32(value, num_bits))
        }
    }

    /// Reads `num_bits` bits as a signed two's complement value and returns it divided by
    /// `2^16`, i.e. as an `FB` (fixed-point bits) field.
    pub fn get_fixed_bit(&mut self, num_bits: u32) -> io::Result<f32> {
        Ok(self.get_signed(num_bits)? as f32 / 65536.0)
    }

    /// Reads a single bit as a boolean flag.
    pub fn get_flag(&mut self) -> io::Result<bool> {
        Ok(self.get_unsigned(1)? != 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::io::BufStream;
    use super::BitConsumer;

    #[test]
    fn signed_bit_reads_match_reference_scenario() {
        // 0x7b 0xf8 = 0b0111_1011 0b1111_1000
        let mut bc = BitConsumer::new(BufStream::new(&[0x7b, 0xf8]));

        assert_eq!(bc.get_signed(0).unwrap(), 0);
        assert_eq!(bc.get_signed(4).unwrap(), 7);
        assert_eq!(bc.get_signed(10).unwrap(), -258);
    }

    #[test]
    fn width_one_signed_read_is_unsigned() {
        let mut bc = BitConsumer::new(BufStream::new(&[0b1000_0000]));
        assert_eq!(bc.get_signed(1).unwrap(), 1);

        let mut bc = BitConsumer::new(BufStream::new(&[0b0000_0000]));
        assert_eq!(bc.get_signed(1).unwrap(), 0);
    }

    #[test]
    fn get_unsigned_spans_byte_boundary() {
        let mut bc = BitConsumer::new(BufStream::new(&[0b1010_0101, 0b0111_1110]));
        assert_eq!(bc.get_unsigned(4).unwrap(), 0b1010);
        assert_eq!(bc.get_unsigned(8).unwrap(), 0b0101_0111);
        assert_eq!(bc.get_unsigned(4).unwrap(), 0b1110);
    }

    #[test]
    fn get_flag_reads_single_bits() {
        let mut bc = BitConsumer::new(BufStream::new(&[0b1010_0000]));
        assert_eq!(bc.get_flag().unwrap(), true);
        assert_eq!(bc.get_flag().unwrap(), false);
        assert_eq!(bc.get_flag().unwrap(), true);
        assert_eq!(bc.get_flag().unwrap(), false);
    }
}
