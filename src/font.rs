// DefineFont2/DefineFont3 (a shared parser over the EM-square scale), DefineFontAlignZones and
// DefineFontName.

use crate::errors::Result;
use crate::io::{BitConsumer, Bytestream, FiniteStream};
use crate::primitives::{read_float16, read_langcode, read_string};
use crate::records::{read_kerning_record, KerningRecord};
use crate::shape::{read_shape, ShapeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFlags {
    pub has_layout: bool,
    pub shift_jis: bool,
    pub small_text: bool,
    pub ansi: bool,
    pub wide_offsets: bool,
    pub wide_codes: bool,
    pub italic: bool,
    pub bold: bool,
}

fn read_font_flags<S: Bytestream>(src: &mut S) -> Result<FontFlags> {
    let mut bc = BitConsumer::new(&mut *src);
    Ok(FontFlags {
        has_layout: bc.get_flag()?,
        shift_jis: bc.get_flag()?,
        small_text: bc.get_flag()?,
        ansi: bc.get_flag()?,
        wide_offsets: bc.get_flag()?,
        wide_codes: bc.get_flag()?,
        italic: bc.get_flag()?,
        bold: bc.get_flag()?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontLayout {
    pub ascent: u16,
    pub descent: u16,
    pub leading: i16,
    pub advances: Vec<i16>,
    pub bounds: Vec<crate::records::Rect>,
    pub kerning_records: Vec<KerningRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub shape_records: Vec<ShapeRecord>,
    pub code: u16,
    pub advance: Option<i16>,
    pub bounds: Option<crate::records::Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineFont2 {
    pub font_id: u16,
    pub flags: FontFlags,
    pub language_code: u8,
    pub font_name: String,
    pub glyphs: Vec<Glyph>,
    pub layout: Option<FontLayout>,
}

/// Shared parser for `DefineFont2` and `DefineFont3`; the only difference between the two tags
/// is the EM-square divisor used downstream to interpret glyph coordinates, which this crate
/// leaves to the caller since it has no rendering concerns of its own.
pub fn read_define_font2_generic<S: Bytestream + FiniteStream>(src: &mut S) -> Result<DefineFont2> {
    let font_id = src.read_u16()?;
    let flags = read_font_flags(src)?;
    let language_code = read_langcode(src)?;

    let font_name_len = src.read_u8()?;
    let font_name_raw = src.read_vec_bytes(font_name_len as usize)?;
    let font_name = String::from_utf8_lossy(&font_name_raw).trim_end_matches('\0').to_string();

    let num_glyphs = src.read_u16()?;

    let offset_width = if flags.wide_offsets { 4 } else { 2 };
    let mut offset_table = Vec::with_capacity(num_glyphs as usize);
    for _ in 0..num_glyphs {
        let off = if flags.wide_offsets { src.read_u32()? } else { u32::from(src.read_u16()?) };
        offset_table.push(off);
    }
    let code_table_offset =
        if flags.wide_offsets { src.read_u32()? } else { u32::from(src.read_u16()?) };

    // OffsetTable entries are measured from the start of OffsetTable itself; we've already
    // consumed OffsetTable and CodeTableOffset, so what remains is read sequentially rather than
    // by seeking to each recorded offset (ScopedStream does not support seeking).
    let _ = code_table_offset;
    let _ = offset_width;

    // Glyph outlines are a bare SHAPE, not a SHAPEWITHSTYLE, and are always read with
    // shape_number hardcoded to 0 (never the enclosing font's own version), so the NewStyles
    // width-propagation gate and fill color model match that, not DefineFont2/3's tag version.
    let mut shapes = Vec::with_capacity(num_glyphs as usize);
    for _ in 0..num_glyphs {
        shapes.push(read_shape(src, 0)?);
    }

    let mut codes = Vec::with_capacity(num_glyphs as usize);
    for _ in 0..num_glyphs {
        let code = if flags.wide_codes { src.read_u16()? } else { u16::from(src.read_u8()?) };
        codes.push(code);
    }

    let layout = if flags.has_layout {
        let ascent = src.read_u16()?;
        let descent = src.read_u16()?;
        let leading = src.read_i16()?;

        let mut advances = Vec::with_capacity(num_glyphs as usize);
        for _ in 0..num_glyphs {
            advances.push(src.read_i16()?);
        }

        let mut bounds = Vec::with_capacity(num_glyphs as usize);
        for _ in 0..num_glyphs {
            bounds.push(crate::records::read_rect(src)?);
        }

        let kerning_count = src.read_u16()?;
        let mut kerning_records = Vec::with_capacity(kerning_count as usize);
        for _ in 0..kerning_count {
            kerning_records.push(read_kerning_record(src, flags.wide_codes)?);
        }

        Some(FontLayout { ascent, descent, leading, advances, bounds, kerning_records })
    }
    else {
        None
    };

    let glyphs = shapes
        .into_iter()
        .zip(codes.into_iter())
        .enumerate()
        .map(|(i, (shape_records, code))| Glyph {
            shape_records,
            code,
            advance: layout.as_ref().and_then(|l| l.advances.get(i).copied()),
            bounds: layout.as_ref().and_then(|l| l.bounds.get(i).cloned()),
        })
        .collect();

    Ok(DefineFont2 { font_id, flags, language_code, font_name, glyphs, layout })
}

/// One `(AlignmentCoordinate, Range)` pair within a `ZoneRecord`'s `ZoneData` array. Both fields
/// are `FLOAT16`s, not the plain 16-bit integers a glance at the field names might suggest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneDatum {
    pub alignment_coordinate: f32,
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub zone_data: Vec<ZoneDatum>,
    pub zone_mask_y: bool,
    pub zone_mask_x: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineFontAlignZones {
    pub font_id: u16,
    pub csm_table_hint: u8,
    pub zones: Vec<ZoneRecord>,
}

/// `DefineFontAlignZones` gives one `ZoneRecord` per glyph of the most recently seen
/// `DefineFont2`/`DefineFont3`; the tag dispatcher threads that count through as `num_glyphs`
/// rather than this module tracking cross-tag state itself.
pub fn read_define_font_align_zones<S: Bytestream>(
    src: &mut S,
    num_glyphs: u16,
) -> Result<DefineFontAlignZones> {
    let font_id = src.read_u16()?;
    let csm_table_hint = {
        let mut bc = BitConsumer::new(&mut *src);
        let hint = bc.get_unsigned(2)? as u8;
        let _reserved = bc.get_unsigned(6)?;
        hint
    };

    let mut zones = Vec::with_capacity(num_glyphs as usize);
    for _ in 0..num_glyphs {
        let num_zone_data = src.read_u8()?;

        let mut zone_data = Vec::with_capacity(num_zone_data as usize);
        for _ in 0..num_zone_data {
            let alignment_coordinate = read_float16(src)?;
            let range = read_float16(src)?;
            zone_data.push(ZoneDatum { alignment_coordinate, range });
        }

        let (zone_mask_y, zone_mask_x) = {
            let mut bc = BitConsumer::new(&mut *src);
            let _reserved = bc.get_unsigned(6)?;
            (bc.get_flag()?, bc.get_flag()?)
        };

        zones.push(ZoneRecord { zone_data, zone_mask_y, zone_mask_x });
    }

    Ok(DefineFontAlignZones { font_id, csm_table_hint, zones })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineFontName {
    pub font_id: u16,
    pub font_name: String,
    pub font_copyright: String,
}

pub fn read_define_font_name<S: Bytestream>(src: &mut S) -> Result<DefineFontName> {
    Ok(DefineFontName {
        font_id: src.read_u16()?,
        font_name: read_string(src)?,
        font_copyright: read_string(src)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{BufStream, ScopedStream};

    #[test]
    fn font_flags_bit_order() {
        // HasLayout(1) ShiftJIS(0) SmallText(0) ANSI(0) WideOffsets(1) WideCodes(0) Italic(0) Bold(1)
        let bytes = [0b1000_1001u8];
        let mut src = BufStream::new(&bytes);
        let flags = read_font_flags(&mut src).unwrap();
        assert!(flags.has_layout);
        assert!(flags.wide_offsets);
        assert!(flags.bold);
        assert!(!flags.wide_codes);
    }

    #[test]
    fn define_font_name_reads_two_strings() {
        let mut bytes = vec![0x01, 0x00];
        bytes.extend_from_slice(b"Arial\x00");
        bytes.extend_from_slice(b"(c) Test\x00");
        let mut src = BufStream::new(&bytes);
        let len = bytes_len(&bytes);
        let mut scoped = ScopedStream::new(&mut src, "DefineFontName", 0, len);
        let obj = read_define_font_name(&mut scoped).unwrap();
        scoped.finish().unwrap();
        assert_eq!(obj.font_name, "Arial");
        assert_eq!(obj.font_copyright, "(c) Test");
    }

    fn bytes_len(bytes: &[u8]) -> u64 {
        bytes.len() as u64
    }
}
