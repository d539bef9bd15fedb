// The 8-byte SWF signature/version/length prefix, the CWS zlib body, and the header record
// (frame size, frame rate, frame count) that follows it.

use std::io::Read;

use log::debug;

use crate::errors::{decompression_error, protocol_error, Result};
use crate::io::{BufStream, Bytestream};
use crate::records::{read_rect, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub compression: Compression,
    pub version: u8,
    pub file_length: u32,
    pub frame_size: Rect,
    /// The raw 16-bit frame rate field (8.8 fixed-point FPS), not decoded to a float — see
    /// DESIGN.md's note on this Open Question.
    pub frame_rate: u16,
    pub frame_count: u16,
}

/// Reads the 8-byte file prefix and, if compressed, inflates the remainder of `raw` into a
/// fresh buffer. Returns the parsed header plus the (possibly freshly-inflated) body bytes
/// positioned at the start of the tag stream.
pub fn read_header(raw: &[u8]) -> Result<(Header, Vec<u8>)> {
    let mut prefix = BufStream::new(raw);

    let signature = [prefix.read_u8()?, prefix.read_u8()?, prefix.read_u8()?];
    let compression = match &signature {
        b"FWS" => Compression::None,
        b"CWS" => Compression::Zlib,
        b"ZWS" => {
            return protocol_error("FWS or CWS signature (LZMA-compressed ZWS is unsupported)", 0)
        }
        _ => return protocol_error("FWS or CWS signature", 0),
    };

    let version = prefix.read_u8()?;
    let file_length = prefix.read_u32()?;

    let body = match compression {
        Compression::None => raw[8..].to_vec(),
        Compression::Zlib => {
            debug!("inflating CWS body ({} bytes compressed)", raw.len() - 8);
            let mut inflater = flate2::read::ZlibDecoder::new(&raw[8..]);
            let mut out = Vec::new();
            if inflater.read_to_end(&mut out).is_err() {
                return decompression_error("zlib inflate of CWS body failed");
            }
            if out.len() as u64 + 8 != u64::from(file_length) {
                return decompression_error(
                    "inflated CWS body length disagrees with the header's declared FileLength",
                );
            }
            debug!("inflated CWS body to {} bytes", out.len());
            out
        }
    };

    let mut body_stream = BufStream::new(&body);
    let frame_size = read_rect(&mut body_stream)?;
    let frame_rate = body_stream.read_u16()?;
    let frame_count = body_stream.read_u16()?;

    let header = Header { compression, version, file_length, frame_size, frame_rate, frame_count };
    let tag_stream_offset = body_stream.pos() as usize;

    Ok((header, body[tag_stream_offset..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn uncompressed_body() -> Vec<u8> {
        // RECT nbits=0 (all-zero frame size), FrameRate, FrameCount, then End tag.
        let mut body = vec![0x01, 0x00, 0x00, 0x00];
        body.extend_from_slice(&[0x00, 0x0c]);
        body.extend_from_slice(&[0x01, 0x00]);
        body.extend_from_slice(&[0x00, 0x00]);
        body
    }

    #[test]
    fn reads_uncompressed_fws_header() {
        let body = uncompressed_body();
        let mut bytes = b"FWS".to_vec();
        bytes.push(6);
        bytes.extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);

        let (header, tail) = read_header(&bytes).unwrap();
        assert_eq!(header.compression, Compression::None);
        assert_eq!(header.version, 6);
        assert_eq!(header.frame_count, 1);
        assert_eq!(tail, &[0x00, 0x00]);
    }

    #[test]
    fn reads_compressed_cws_header_and_checks_length_invariant() {
        let body = uncompressed_body();
        let declared_length = 8 + body.len() as u32;

        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&body).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut bytes = b"CWS".to_vec();
        bytes.push(10);
        bytes.extend_from_slice(&declared_length.to_le_bytes());
        bytes.extend_from_slice(&compressed);

        let (header, tail) = read_header(&bytes).unwrap();
        assert_eq!(header.compression, Compression::Zlib);
        assert_eq!(tail, &[0x00, 0x00]);
    }

    #[test]
    fn rejects_cws_whose_inflated_length_disagrees_with_declared_length() {
        let body = uncompressed_body();

        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&body).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut bytes = b"CWS".to_vec();
        bytes.push(10);
        bytes.extend_from_slice(&999u32.to_le_bytes()); // wrong declared length
        bytes.extend_from_slice(&compressed);

        assert!(matches!(read_header(&bytes), Err(crate::errors::Error::DecompressionFailure(_))));
    }

    #[test]
    fn rejects_zws_lzma_signature() {
        let bytes = vec![b'Z', b'W', b'S', 13, 0, 0, 0, 0];
        assert!(matches!(read_header(&bytes), Err(crate::errors::Error::ProtocolAssertionFailure { .. })));
    }
}
