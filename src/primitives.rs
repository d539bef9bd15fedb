// Primitive value unpackers for the SWF tag stream: byte-aligned fixed-point and
// variable-length encodings that sit below the structural record layer.

use crate::errors::Result;
use crate::io::{BitConsumer, Bytestream};

/// Reads an `ENCODEDU32`: a base-128, little-endian-by-group varint capped at five bytes
/// (35 encodable bits, truncated to 32 on return). The continuation bit is the MSB of each byte.
pub fn read_encoded_u32<S: Bytestream>(src: &mut S) -> Result<u32> {
    let mut result: u32 = 0;

    for i in 0..5 {
        let byte = src.read_u8()?;
        result |= u32::from(byte & 0x7f) << (7 * i);

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok(result)
}

/// Reads a NUL-terminated `STRING`. The terminator is consumed but not included in the result.
/// Bytes are decoded as UTF-8, with invalid sequences replaced per `String::from_utf8_lossy`
/// (the format does not declare an encoding; UTF-8 is the de facto convention for SWF6+ content).
pub fn read_string<S: Bytestream>(src: &mut S) -> Result<String> {
    let mut bytes = Vec::new();

    loop {
        let byte = src.read_u8()?;
        if byte == 0 {
            break;
        }
        bytes.push(byte);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a `LANGCODE`: a single byte identifying a language for text-layout purposes. The format
/// never defines more than a handful of values, so this is deliberately left as a raw byte rather
/// than an enum the decoder would have to reject unknown values from.
pub fn read_langcode<S: Bytestream>(src: &mut S) -> Result<u8> {
    Ok(src.read_u8()?)
}

/// Reads a `FIXED16` (the generic 32-bit 16.16 fixed-point field the source calls `FIXED`):
/// two unsigned 16-bit halves `(frac, int)`, value `int + frac/65536`. Both halves are read as
/// plain unsigned integers, never sign-extended — matching the reference source's
/// `unpack_fixed16`, which has no negative branch even for fields (e.g. filter `BlurX`/`Angle`)
/// the full SWF19 spec documents as signed.
pub fn read_fixed<S: Bytestream>(src: &mut S) -> Result<f64> {
    let frac = src.read_u16()?;
    let int_part = src.read_u16()?;
    Ok(f64::from(int_part) + f64::from(frac) / 65536.0)
}

/// Reads a `FIXED8`: two unsigned bytes `(frac, int)`, value `int + frac/256`, matching the
/// reference source's `unpack_fixed8` exactly (no sign extension).
pub fn read_fixed8<S: Bytestream>(src: &mut S) -> Result<f32> {
    let frac = src.read_u8()?;
    let int_part = src.read_u8()?;
    Ok(f32::from(int_part) + f32::from(frac) / 256.0)
}

/// Decodes a `FLOAT16` value already assembled into a single 16-bit word with the sign bit in
/// bit 15, exponent in bits 14..=10, and mantissa in bits 9..=0 — i.e. the fields in the same
/// MSB-first bit order they're read from the stream in, NOT a little-endian byte pair. Callers
/// that already hold two separate bytes must combine them big-endian (`(b0 << 8) | b1`) before
/// calling this, never via `u16::from_le_bytes`.
///
/// The sign term is the mathematically correct `(-1)^sign`, not the always-negative expression a
/// naive transcription of the reference formula's operator precedence would produce (see
/// DESIGN.md).
pub fn decode_float16(raw: u16) -> f32 {
    let sign: f32 = if (raw >> 15) & 0x1 == 1 { -1.0 } else { 1.0 };
    let exponent = i32::from((raw >> 10) & 0x1f);
    let mantissa = f32::from(raw & 0x3ff);

    sign * (mantissa / 1024.0) * 10f32.powi(exponent - 16)
}

/// Reads a `FLOAT16` directly from the stream. The three fields are bit-packed MSB-first across
/// the two bytes, the same way any other bit-level record is — not a little-endian 16-bit word —
/// so this reads through a fresh `BitConsumer` rather than `read_u16`, whose byte order would
/// silently swap the sign/exponent bits into the wrong byte.
pub fn read_float16<S: Bytestream>(src: &mut S) -> Result<f32> {
    let mut bc = BitConsumer::new(&mut *src);
    let sign = bc.get_unsigned(1)?;
    let exponent = bc.get_unsigned(5)?;
    let mantissa = bc.get_unsigned(10)?;
    let raw = ((sign << 15) | (exponent << 10) | mantissa) as u16;
    Ok(decode_float16(raw))
}
