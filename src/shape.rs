// SHAPE and SHAPEWITHSTYLE: fill/line style arrays and the bit-level shape-record sequence they
// introduce. Glyph outlines (DefineFont2/3) use the bare SHAPE form; DefineShape/1-4 use
// SHAPEWITHSTYLE.

use crate::errors::Result;
use crate::io::{BitConsumer, Bytestream};
use crate::primitives::read_fixed8;
use crate::records::{
    read_focal_gradient, read_gradient, read_matrix, read_rgb, read_rgba, FocalGradient, Gradient,
    Matrix, Rgba,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    Solid(Rgba),
    LinearGradient { matrix: Matrix, gradient: Gradient },
    RadialGradient { matrix: Matrix, gradient: Gradient },
    FocalRadialGradient { matrix: Matrix, gradient: FocalGradient },
    Bitmap { bitmap_id: u16, matrix: Matrix, repeating: bool, smoothed: bool },
}

fn read_fill_style<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<FillStyle> {
    let fill_style_type = src.read_u8()?;
    let rgba = shape_version >= 3;

    let style = match fill_style_type {
        0x00 => FillStyle::Solid(if rgba { read_rgba(src)? } else { read_rgb(src)?.into() }),
        0x10 => {
            let matrix = read_matrix(src)?;
            FillStyle::LinearGradient { matrix, gradient: read_gradient(src, rgba)? }
        }
        0x12 => {
            let matrix = read_matrix(src)?;
            FillStyle::RadialGradient { matrix, gradient: read_gradient(src, rgba)? }
        }
        0x13 => {
            let matrix = read_matrix(src)?;
            FillStyle::FocalRadialGradient { matrix, gradient: read_focal_gradient(src, rgba)? }
        }
        0x40 | 0x41 | 0x42 | 0x43 => {
            let bitmap_id = src.read_u16()?;
            let matrix = read_matrix(src)?;
            FillStyle::Bitmap {
                bitmap_id,
                matrix,
                repeating: fill_style_type == 0x40 || fill_style_type == 0x42,
                smoothed: fill_style_type == 0x42 || fill_style_type == 0x43,
            }
        }
        other => {
            return crate::errors::unknown_name_error("FillStyleType", u32::from(other), src.pos())
        }
    };

    Ok(style)
}

fn read_fill_style_array_count<S: Bytestream>(src: &mut S) -> Result<u16> {
    let count = src.read_u8()?;
    if count == 0xff { Ok(src.read_u16()?) } else { Ok(u16::from(count)) }
}

pub fn read_fill_style_array<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<Vec<FillStyle>> {
    let count = read_fill_style_array_count(src)?;
    let mut styles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        styles.push(read_fill_style(src, shape_version)?);
    }
    Ok(styles)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineStyleFill {
    Color(Rgba),
    Style(FillStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub width: u16,
    pub start_cap_style: u8,
    pub join_style: u8,
    pub no_h_scale: bool,
    pub no_v_scale: bool,
    pub pixel_hinting: bool,
    pub no_close: bool,
    pub end_cap_style: u8,
    pub miter_limit_factor: Option<f32>,
    pub fill: LineStyleFill,
}

fn read_line_style<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<LineStyle> {
    let width = src.read_u16()?;

    if shape_version < 4 {
        let color = if shape_version >= 3 { read_rgba(src)? } else { read_rgb(src)?.into() };
        return Ok(LineStyle {
            width,
            start_cap_style: 0,
            join_style: 0,
            no_h_scale: false,
            no_v_scale: false,
            pixel_hinting: false,
            no_close: false,
            end_cap_style: 0,
            miter_limit_factor: None,
            fill: LineStyleFill::Color(color),
        });
    }

    let (start_cap_style, join_style, has_fill, no_h_scale, no_v_scale, pixel_hinting, no_close, end_cap_style) = {
        let mut bc = BitConsumer::new(&mut *src);
        let start_cap_style = bc.get_unsigned(2)? as u8;
        let join_style = bc.get_unsigned(2)? as u8;
        let has_fill = bc.get_flag()?;
        let no_h_scale = bc.get_flag()?;
        let no_v_scale = bc.get_flag()?;
        let pixel_hinting = bc.get_flag()?;
        let _reserved = bc.get_unsigned(5)?;
        let no_close = bc.get_flag()?;
        let end_cap_style = bc.get_unsigned(2)? as u8;
        (start_cap_style, join_style, has_fill, no_h_scale, no_v_scale, pixel_hinting, no_close, end_cap_style)
    };

    let miter_limit_factor = if join_style == 2 { Some(read_fixed8(src)?) } else { None };

    let fill = if has_fill {
        LineStyleFill::Style(read_fill_style(src, shape_version)?)
    }
    else {
        LineStyleFill::Color(read_rgba(src)?)
    };

    Ok(LineStyle {
        width, start_cap_style, join_style, no_h_scale, no_v_scale, pixel_hinting, no_close,
        end_cap_style, miter_limit_factor, fill,
    })
}

pub fn read_line_style_array<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<Vec<LineStyle>> {
    let count = read_fill_style_array_count(src)?;
    let mut styles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        styles.push(read_line_style(src, shape_version)?);
    }
    Ok(styles)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyles {
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle>,
    pub num_fill_bits: u32,
    pub num_line_bits: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleChangeRecord {
    pub move_to: Option<(i32, i32)>,
    pub fill_style_0: Option<u32>,
    pub fill_style_1: Option<u32>,
    pub line_style: Option<u32>,
    pub new_styles: Option<ShapeStyles>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeRecord {
    StyleChange(StyleChangeRecord),
    StraightEdge { delta_x: i32, delta_y: i32 },
    CurvedEdge { control_delta_x: i32, control_delta_y: i32, anchor_delta_x: i32, anchor_delta_y: i32 },
    End,
}

/// Reads the bit-level shape-record sequence shared by `SHAPE` and `SHAPEWITHSTYLE`.
///
/// `shape_number` gates whether a `StateNewStyles` record's re-read fill/line bit widths replace
/// the widths used for subsequent records — this is preserved as a deliberate, documented
/// deviation from what a literal reading of the format would suggest (see DESIGN.md): the
/// re-read widths are always consumed from the stream so the byte/bit cursor stays correct, but
/// they only take effect for `shape_number > 2`.
pub fn read_shape_records<S: Bytestream>(
    src: &mut S,
    shape_version: u8,
    initial_num_fill_bits: u32,
    initial_num_line_bits: u32,
) -> Result<Vec<ShapeRecord>> {
    let mut records = Vec::new();
    let mut num_fill_bits = initial_num_fill_bits;
    let mut num_line_bits = initial_num_line_bits;

    let mut bc = BitConsumer::new(&mut *src);

    loop {
        if bc.get_flag()? {
            // Edge record.
            let straight = bc.get_flag()?;
            let num_bits = bc.get_unsigned(4)? + 2;

            if straight {
                let general_line = bc.get_flag()?;

                let (delta_x, delta_y) = if general_line {
                    (bc.get_signed(num_bits)?, bc.get_signed(num_bits)?)
                }
                else if bc.get_flag()? {
                    (0, bc.get_signed(num_bits)?)
                }
                else {
                    (bc.get_signed(num_bits)?, 0)
                };

                records.push(ShapeRecord::StraightEdge { delta_x, delta_y });
            }
            else {
                let control_delta_x = bc.get_signed(num_bits)?;
                let control_delta_y = bc.get_signed(num_bits)?;
                let anchor_delta_x = bc.get_signed(num_bits)?;
                let anchor_delta_y = bc.get_signed(num_bits)?;

                records.push(ShapeRecord::CurvedEdge {
                    control_delta_x, control_delta_y, anchor_delta_x, anchor_delta_y,
                });
            }
        }
        else {
            let state_new_styles = bc.get_flag()?;
            let state_line_style = bc.get_flag()?;
            let state_fill_style_1 = bc.get_flag()?;
            let state_fill_style_0 = bc.get_flag()?;
            let state_move_to = bc.get_flag()?;

            if !state_new_styles && !state_line_style && !state_fill_style_1
                && !state_fill_style_0 && !state_move_to
            {
                records.push(ShapeRecord::End);
                break;
            }

            let move_to = if state_move_to {
                let move_bits = bc.get_unsigned(5)?;
                Some((bc.get_signed(move_bits)?, bc.get_signed(move_bits)?))
            }
            else {
                None
            };

            let fill_style_0 = if state_fill_style_0 { Some(bc.get_unsigned(num_fill_bits)?) } else { None };
            let fill_style_1 = if state_fill_style_1 { Some(bc.get_unsigned(num_fill_bits)?) } else { None };
            let line_style = if state_line_style { Some(bc.get_unsigned(num_line_bits)?) } else { None };

            let new_styles = if state_new_styles {
                // New style arrays are always byte-aligned.
                let inner = bc.into_inner();
                let fill_styles = read_fill_style_array(inner, shape_version)?;
                let line_styles = read_line_style_array(inner, shape_version)?;

                let mut inner_bc = BitConsumer::new(inner);
                let new_fill_bits = inner_bc.get_unsigned(4)?;
                let new_line_bits = inner_bc.get_unsigned(4)?;

                if shape_version > 2 {
                    num_fill_bits = new_fill_bits;
                    num_line_bits = new_line_bits;
                }

                bc = inner_bc;

                Some(ShapeStyles {
                    fill_styles,
                    line_styles,
                    num_fill_bits: new_fill_bits,
                    num_line_bits: new_line_bits,
                })
            }
            else {
                None
            };

            records.push(ShapeRecord::StyleChange(StyleChangeRecord {
                move_to, fill_style_0, fill_style_1, line_style, new_styles,
            }));
        }
    }

    Ok(records)
}

/// The bare `SHAPE` record used by glyph outlines: no style arrays, just the fill/line bit
/// widths and the record sequence.
pub fn read_shape<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<Vec<ShapeRecord>> {
    let (num_fill_bits, num_line_bits) = {
        let mut bc = BitConsumer::new(&mut *src);
        (bc.get_unsigned(4)?, bc.get_unsigned(4)?)
    };
    read_shape_records(src, shape_version, num_fill_bits, num_line_bits)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeWithStyle {
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle>,
    pub records: Vec<ShapeRecord>,
}

pub fn read_shape_with_style<S: Bytestream>(src: &mut S, shape_version: u8) -> Result<ShapeWithStyle> {
    let fill_styles = read_fill_style_array(src, shape_version)?;
    let line_styles = read_line_style_array(src, shape_version)?;

    let (num_fill_bits, num_line_bits) = {
        let mut bc = BitConsumer::new(&mut *src);
        (bc.get_unsigned(4)?, bc.get_unsigned(4)?)
    };

    let records = read_shape_records(src, shape_version, num_fill_bits, num_line_bits)?;

    Ok(ShapeWithStyle { fill_styles, line_styles, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufStream;

    #[test]
    fn fill_style_array_count_extends_past_0xfe() {
        let mut src = BufStream::new(&[0xff, 0x00, 0x01]); // 0xff => read extended u16 count
        assert_eq!(read_fill_style_array_count(&mut src).unwrap(), 256);
    }

    #[test]
    fn solid_fill_style_reads_rgb_below_shape3_and_rgba_from_shape3() {
        let mut src = BufStream::new(&[0x00, 0x10, 0x20, 0x30]);
        match read_fill_style(&mut src, 1).unwrap() {
            FillStyle::Solid(Rgba { red, green, blue, alpha }) => {
                assert_eq!((red, green, blue, alpha), (0x10, 0x20, 0x30, 0xff));
            }
            other => panic!("expected Solid, got {:?}", other),
        }

        let mut src = BufStream::new(&[0x00, 0x10, 0x20, 0x30, 0x40]);
        match read_fill_style(&mut src, 3).unwrap() {
            FillStyle::Solid(Rgba { red, green, blue, alpha }) => {
                assert_eq!((red, green, blue, alpha), (0x10, 0x20, 0x30, 0x40));
            }
            other => panic!("expected Solid, got {:?}", other),
        }
    }

    #[test]
    fn fill_style_rejects_unknown_type() {
        let mut src = BufStream::new(&[0xaa]);
        assert!(read_fill_style(&mut src, 1).is_err());
    }

    #[test]
    fn shape1_line_style_has_no_cap_or_join_fields() {
        // Width=1, RGB color.
        let mut src = BufStream::new(&[0x01, 0x00, 0x10, 0x20, 0x30]);
        let style = read_line_style(&mut src, 1).unwrap();
        assert_eq!(style.width, 1);
        assert!(matches!(style.fill, LineStyleFill::Color(_)));
        assert_eq!(style.miter_limit_factor, None);
    }

    #[test]
    fn shape_records_terminate_on_all_zero_flags() {
        // Zero fill/line bit widths, then a single all-zero StyleChangeRecord flag byte (End).
        let mut src = BufStream::new(&[0b0000_0000, 0b0000_0000]);
        let records = read_shape_records(&mut src, 1, 0, 0).unwrap();
        assert_eq!(records, vec![ShapeRecord::End]);
    }

    #[test]
    fn shape_records_read_straight_edge() {
        // EdgeFlag=1 StraightFlag=1 NumBits(4 bits)=0b0000 (+2=2) GeneralLine=1 dx(2 bits)=01(=1)
        // dy(2 bits)=11(=-1), followed by a zero-flags StyleChangeRecord terminator (End).
        let bits = [0b1100_0010u8, 0b1110_0000, 0b0000_0000];
        let mut src = BufStream::new(&bits);
        let records = read_shape_records(&mut src, 1, 0, 0).unwrap();
        assert!(matches!(records[0], ShapeRecord::StraightEdge { delta_x: 1, delta_y: -1 }));
        assert_eq!(*records.last().unwrap(), ShapeRecord::End);
    }
}
