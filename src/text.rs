// DefineText/DefineText2 (a shared parser over the RGB/RGBA color width) and DefineEditText.

use crate::errors::Result;
use crate::io::{BitConsumer, Bytestream};
use crate::primitives::read_string;
use crate::records::{read_matrix, read_rect, read_rgb, read_rgba, Matrix, Rect, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphEntry {
    pub glyph_index: u32,
    pub glyph_advance: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRecord {
    pub font_id: Option<u16>,
    pub text_color: Option<Rgba>,
    pub x_offset: Option<i16>,
    pub y_offset: Option<i16>,
    pub text_height: Option<u16>,
    pub glyphs: Vec<GlyphEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineText {
    pub character_id: u16,
    pub text_bounds: Rect,
    pub text_matrix: Matrix,
    pub glyph_bits: u8,
    pub advance_bits: u8,
    pub text_records: Vec<TextRecord>,
}

fn read_text_record<S: Bytestream>(
    src: &mut S,
    glyph_bits: u32,
    advance_bits: u32,
    rgba: bool,
    first_byte: u8,
) -> Result<TextRecord> {
    let (has_font, has_color, has_y_offset, has_x_offset) = {
        let mut bc = BitConsumer::new_with_byte(&mut *src, first_byte);
        let _type_flag = bc.get_unsigned(1)?;
        let _reserved = bc.get_unsigned(3)?;
        (bc.get_flag()?, bc.get_flag()?, bc.get_flag()?, bc.get_flag()?)
    };

    let font_id = if has_font { Some(src.read_u16()?) } else { None };
    let text_color =
        if has_color { Some(if rgba { read_rgba(src)? } else { read_rgb(src)?.into() }) } else { None };
    let x_offset = if has_x_offset { Some(src.read_i16()?) } else { None };
    let y_offset = if has_y_offset { Some(src.read_i16()?) } else { None };
    let text_height = if has_font { Some(src.read_u16()?) } else { None };

    let glyph_count = src.read_u8()?;
    let mut glyphs = Vec::with_capacity(glyph_count as usize);
    let mut bc = BitConsumer::new(&mut *src);
    for _ in 0..glyph_count {
        let glyph_index = bc.get_unsigned(glyph_bits)?;
        let glyph_advance = bc.get_unsigned(advance_bits)?;
        glyphs.push(GlyphEntry { glyph_index, glyph_advance });
    }

    Ok(TextRecord { font_id, text_color, x_offset, y_offset, text_height, glyphs })
}

fn read_define_text_generic<S: Bytestream>(src: &mut S, rgba: bool) -> Result<DefineText> {
    let character_id = src.read_u16()?;
    let text_bounds = read_rect(src)?;
    let text_matrix = read_matrix(src)?;
    let glyph_bits = src.read_u8()?;
    let advance_bits = src.read_u8()?;

    let mut text_records = Vec::new();
    loop {
        let peek = src.read_u8()?;
        if peek == 0 {
            break;
        }
        text_records.push(read_text_record(
            src,
            u32::from(glyph_bits),
            u32::from(advance_bits),
            rgba,
            peek,
        )?);
    }

    Ok(DefineText { character_id, text_bounds, text_matrix, glyph_bits, advance_bits, text_records })
}

pub fn read_define_text<S: Bytestream>(src: &mut S) -> Result<DefineText> {
    read_define_text_generic(src, false)
}

pub fn read_define_text2<S: Bytestream>(src: &mut S) -> Result<DefineText> {
    read_define_text_generic(src, true)
}

/// Every conditional field `DefineEditText` may carry, in its exact on-wire flag order.
#[derive(Debug, Clone, PartialEq)]
pub struct DefineEditText {
    pub character_id: u16,
    pub bounds: Rect,
    pub word_wrap: bool,
    pub multiline: bool,
    pub password: bool,
    pub read_only: bool,
    pub auto_size: bool,
    pub no_select: bool,
    pub border: bool,
    pub was_static: bool,
    pub html: bool,
    pub use_outlines: bool,
    pub font_id: Option<u16>,
    pub font_class: Option<String>,
    pub font_height: Option<u16>,
    pub text_color: Option<Rgba>,
    pub max_length: Option<u16>,
    pub layout: Option<EditTextLayout>,
    pub variable_name: String,
    pub initial_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTextLayout {
    pub align: u8,
    pub left_margin: u16,
    pub right_margin: u16,
    pub indent: u16,
    pub leading: u16,
}

pub fn read_define_edit_text<S: Bytestream>(src: &mut S) -> Result<DefineEditText> {
    let character_id = src.read_u16()?;
    let bounds = read_rect(src)?;

    let (
        has_text,
        word_wrap,
        multiline,
        password,
        read_only,
        has_text_color,
        has_max_length,
        has_font,
        has_font_class,
        auto_size,
        has_layout,
        no_select,
        border,
        was_static,
        html,
        use_outlines,
    ) = {
        let mut bc = BitConsumer::new(&mut *src);
        (
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
            bc.get_flag()?,
        )
    };

    let font_id = if has_font { Some(src.read_u16()?) } else { None };
    let font_class = if has_font_class { Some(read_string(src)?) } else { None };
    let font_height = if has_font { Some(src.read_u16()?) } else { None };
    let text_color = if has_text_color { Some(read_rgba(src)?) } else { None };
    let max_length = if has_max_length { Some(src.read_u16()?) } else { None };

    let layout = if has_layout {
        Some(EditTextLayout {
            align: src.read_u8()?,
            left_margin: src.read_u16()?,
            right_margin: src.read_u16()?,
            indent: src.read_u16()?,
            leading: src.read_u16()?,
        })
    }
    else {
        None
    };

    let variable_name = read_string(src)?;
    let initial_text = if has_text { Some(read_string(src)?) } else { None };

    Ok(DefineEditText {
        character_id, bounds, word_wrap, multiline, password, read_only, auto_size, no_select,
        border, was_static, html, use_outlines, font_id, font_class, font_height, text_color,
        max_length, layout, variable_name, initial_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufStream;

    #[test]
    fn define_edit_text_flag_order_selects_conditional_fields() {
        // HasText(1) WordWrap(0) Multiline(0) Password(0) ReadOnly(0) HasTextColor(0)
        // HasMaxLength(0) HasFont(0) HasFontClass(0) AutoSize(0) HasLayout(0) NoSelect(0)
        // Border(0) WasStatic(0) HTML(0) UseOutlines(0) => 0b1000_0000 0b0000_0000
        let mut bytes = vec![0x00, 0x00]; // CharacterID
        bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // RECT nbits=0 -> all zero fields
        bytes.push(0x80);
        bytes.push(0x00);
        bytes.extend_from_slice(b"\x00"); // VariableName (empty string)
        bytes.extend_from_slice(b"hi\x00"); // InitialText

        let mut src = BufStream::new(&bytes);
        let obj = read_define_edit_text(&mut src).unwrap();
        assert!(obj.font_id.is_none());
        assert_eq!(obj.initial_text.as_deref(), Some("hi"));
    }
}
