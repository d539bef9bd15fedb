// Sonata
// Copyright (c) 2019 The Sonata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod actions;
pub mod errors;
pub mod font;
pub mod header;
pub mod io;
pub mod primitives;
pub mod records;
pub mod shape;
pub mod tags;
pub mod text;
mod util;

use io::BufStream;

pub use errors::{Error, Result};
pub use header::{Compression, Header};
pub use tags::Tag;

/// Knobs controlling how strictly the decoder treats unrecognized or malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// When set, an unrecognized tag or action code aborts the decode with
    /// `Error::UnknownName` instead of being preserved as a raw byte run.
    pub unknown_alert: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions { unknown_alert: false }
    }
}

/// A fully decoded SWF file: its header plus the top-level control-tag stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub header: Header,
    pub tags: Vec<Tag>,
}

/// Decodes a complete SWF file from `bytes`, honoring `options`.
///
/// Rejects LZMA-compressed (`ZWS`) input with `Error::ProtocolAssertionFailure` rather than
/// attempting to decompress it (see DESIGN.md's note on this Non-goal).
pub fn decode(bytes: &[u8], options: DecoderOptions) -> Result<Movie> {
    let (header, body) = header::read_header(bytes)?;

    let mut state = tags::DecodeState { file_version: header.version, last_glyph_count: None };
    let mut src = BufStream::new(&body);
    let tags = tags::read_tag_list(&mut src, &mut state, &options)?;

    Ok(Movie { header, tags })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncompressed_movie_bytes() -> Vec<u8> {
        let mut bytes = b"FWS".to_vec();
        bytes.push(6); // version
        bytes.extend_from_slice(&[0u8; 4]); // FileLength (unchecked by this crate)
        bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // RECT, nbits=0 => all-zero frame size
        bytes.extend_from_slice(&[0x00, 0x0c]); // FrameRate (12.0 fps, 8.8 fixed)
        bytes.extend_from_slice(&[0x01, 0x00]); // FrameCount
        bytes.extend_from_slice(&(1u16 << 6).to_le_bytes()); // ShowFrame
        bytes.extend_from_slice(&[0x00, 0x00]); // End
        bytes
    }

    #[test]
    fn decodes_minimal_uncompressed_movie() {
        let bytes = uncompressed_movie_bytes();
        let movie = decode(&bytes, DecoderOptions::default()).unwrap();

        assert_eq!(movie.header.compression, Compression::None);
        assert_eq!(movie.header.version, 6);
        assert_eq!(movie.header.frame_count, 1);
        assert_eq!(movie.tags.len(), 1);
        assert!(matches!(movie.tags[0], Tag::Known(ref body) if **body == tags::TagBody::ShowFrame));
    }

    #[test]
    fn rejects_lzma_signature() {
        let mut bytes = b"ZWS".to_vec();
        bytes.push(13);
        bytes.extend_from_slice(&[0u8; 4]);
        assert!(decode(&bytes, DecoderOptions::default()).is_err());
    }
}
