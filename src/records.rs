// Structural records shared across multiple tags: geometry, color transforms, gradients,
// filters, kerning, and the (deliberately undecoded) clip-action payload.

use crate::errors::Result;
use crate::io::{BitConsumer, Bytestream};
use crate::primitives::{read_fixed, read_fixed8};

/// A `RECT`: four signed twip coordinates sharing a common bit width, read as a single bit-packed
/// record (`NBits` followed by the four fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

pub fn read_rect<S: Bytestream>(src: &mut S) -> Result<Rect> {
    let mut bc = BitConsumer::new(&mut *src);
    let n_bits = bc.get_unsigned(5)?;

    Ok(Rect {
        x_min: bc.get_signed(n_bits)?,
        x_max: bc.get_signed(n_bits)?,
        y_min: bc.get_signed(n_bits)?,
        y_max: bc.get_signed(n_bits)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

pub fn read_rgb<S: Bytestream>(src: &mut S) -> Result<Rgb> {
    Ok(Rgb { red: src.read_u8()?, green: src.read_u8()?, blue: src.read_u8()? })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

pub fn read_rgba<S: Bytestream>(src: &mut S) -> Result<Rgba> {
    Ok(Rgba {
        red: src.read_u8()?,
        green: src.read_u8()?,
        blue: src.read_u8()?,
        alpha: src.read_u8()?,
    })
}

/// A `MATRIX`: an optional scale term, an optional rotate/skew term, and a mandatory translate
/// term, each with its own bit width declared inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub scale: Option<(f32, f32)>,
    pub rotate_skew: Option<(f32, f32)>,
    pub translate_x: i32,
    pub translate_y: i32,
}

pub fn read_matrix<S: Bytestream>(src: &mut S) -> Result<Matrix> {
    let mut bc = BitConsumer::new(&mut *src);

    let scale = if bc.get_flag()? {
        let n_bits = bc.get_unsigned(5)?;
        Some((bc.get_fixed_bit(n_bits)?, bc.get_fixed_bit(n_bits)?))
    }
    else {
        None
    };

    let rotate_skew = if bc.get_flag()? {
        let n_bits = bc.get_unsigned(5)?;
        Some((bc.get_fixed_bit(n_bits)?, bc.get_fixed_bit(n_bits)?))
    }
    else {
        None
    };

    let n_translate_bits = bc.get_unsigned(5)?;
    let translate_x = bc.get_signed(n_translate_bits)?;
    let translate_y = bc.get_signed(n_translate_bits)?;

    Ok(Matrix { scale, rotate_skew, translate_x, translate_y })
}

/// A `CXFORMWITHALPHA`: optional per-channel multiply and add terms, each carrying its own bit
/// width, applied to red/green/blue/alpha in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CxformWithAlpha {
    pub mult: Option<(i32, i32, i32, i32)>,
    pub add: Option<(i32, i32, i32, i32)>,
}

pub fn read_cxform_with_alpha<S: Bytestream>(src: &mut S) -> Result<CxformWithAlpha> {
    let mut bc = BitConsumer::new(&mut *src);

    let has_add = bc.get_flag()?;
    let has_mult = bc.get_flag()?;
    let n_bits = bc.get_unsigned(4)?;

    let mult = if has_mult {
        Some((
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
        ))
    }
    else {
        None
    };

    let add = if has_add {
        Some((
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
            bc.get_signed(n_bits)?,
        ))
    }
    else {
        None
    };

    Ok(CxformWithAlpha { mult, add })
}

/// A `KERNINGRECORD`. Character codes are `u16` when the enclosing font's `WideCodes` flag is
/// set, `u8` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KerningRecord {
    pub code1: u16,
    pub code2: u16,
    pub adjustment: i16,
}

pub fn read_kerning_record<S: Bytestream>(src: &mut S, wide_codes: bool) -> Result<KerningRecord> {
    let (code1, code2) = if wide_codes {
        (src.read_u16()?, src.read_u16()?)
    }
    else {
        (u16::from(src.read_u8()?), u16::from(src.read_u8()?))
    };

    Ok(KerningRecord { code1, code2, adjustment: src.read_i16()? })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientRecord {
    pub ratio: u8,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub spread_mode: u8,
    pub interpolation_mode: u8,
    pub records: Vec<GradientRecord>,
}

/// Reads a `GRADIENT`. `rgba` selects whether gradient record colors carry an alpha channel
/// (shape version ≥ 3) or not.
pub fn read_gradient<S: Bytestream>(src: &mut S, rgba: bool) -> Result<Gradient> {
    let (spread_mode, interpolation_mode, num_gradients) = {
        let mut bc = BitConsumer::new(&mut *src);
        let spread_mode = bc.get_unsigned(2)? as u8;
        let interpolation_mode = bc.get_unsigned(2)? as u8;
        let num_gradients = bc.get_unsigned(4)? as u8;
        (spread_mode, interpolation_mode, num_gradients)
    };

    let mut records = Vec::with_capacity(num_gradients as usize);
    for _ in 0..num_gradients {
        let ratio = src.read_u8()?;
        let color = if rgba { read_rgba(src)? } else { read_rgb(src)?.into() };
        records.push(GradientRecord { ratio, color });
    }

    Ok(Gradient { spread_mode, interpolation_mode, records })
}

impl From<Rgb> for Rgba {
    fn from(rgb: Rgb) -> Rgba {
        Rgba { red: rgb.red, green: rgb.green, blue: rgb.blue, alpha: 0xff }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocalGradient {
    pub gradient: Gradient,
    pub focal_point: f32,
}

pub fn read_focal_gradient<S: Bytestream>(src: &mut S, rgba: bool) -> Result<FocalGradient> {
    let gradient = read_gradient(src, rgba)?;
    let focal_point = read_fixed8(src)?;
    Ok(FocalGradient { gradient, focal_point })
}

/// The eight `FILTER` variants a `FILTERLIST` may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    DropShadow(DropShadowFilter),
    Blur(BlurFilter),
    Glow(GlowFilter),
    Bevel(BevelFilter),
    GradientGlow(GradientGlowFilter),
    Convolution(ConvolutionFilter),
    ColorMatrix(ColorMatrixFilter),
    GradientBevel(GradientBevelFilter),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadowFilter {
    pub color: Rgba,
    pub blur_x: f64,
    pub blur_y: f64,
    pub angle: f64,
    pub distance: f64,
    pub strength: f32,
    pub inner_shadow: bool,
    pub knockout: bool,
    pub composite_source: bool,
    pub passes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurFilter {
    pub blur_x: f64,
    pub blur_y: f64,
    pub passes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowFilter {
    pub color: Rgba,
    pub blur_x: f64,
    pub blur_y: f64,
    pub strength: f32,
    pub inner_glow: bool,
    pub knockout: bool,
    pub composite_source: bool,
    pub passes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevelFilter {
    pub shadow_color: Rgba,
    pub highlight_color: Rgba,
    pub blur_x: f64,
    pub blur_y: f64,
    pub angle: f64,
    pub distance: f64,
    pub strength: f32,
    pub inner_shadow: bool,
    pub knockout: bool,
    pub composite_source: bool,
    pub on_top: bool,
    pub passes: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientGlowFilter {
    pub colors: Vec<Rgba>,
    pub ratios: Vec<u8>,
    pub blur_x: f64,
    pub blur_y: f64,
    pub angle: f64,
    pub distance: f64,
    pub strength: f32,
    pub inner_glow: bool,
    pub knockout: bool,
    pub composite_source: bool,
    pub on_top: bool,
    pub passes: u8,
}

pub type GradientBevelFilter = GradientGlowFilter;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionFilter {
    pub matrix_x: u8,
    pub matrix_y: u8,
    pub divisor: f32,
    pub bias: f32,
    pub matrix: Vec<f32>,
    pub color: Rgba,
    pub clamp: bool,
    pub preserve_alpha: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrixFilter {
    pub matrix: [f32; 20],
}

fn read_glow_flags<S: Bytestream>(src: &mut S) -> Result<(bool, bool, bool, u8)> {
    let mut bc = BitConsumer::new(&mut *src);
    let flag_a = bc.get_flag()?;
    let knockout = bc.get_flag()?;
    let composite_source = bc.get_flag()?;
    let passes = bc.get_unsigned(5)? as u8;
    Ok((flag_a, knockout, composite_source, passes))
}

fn read_bevel_flags<S: Bytestream>(src: &mut S) -> Result<(bool, bool, bool, bool, u8)> {
    let mut bc = BitConsumer::new(&mut *src);
    let flag_a = bc.get_flag()?;
    let knockout = bc.get_flag()?;
    let composite_source = bc.get_flag()?;
    let on_top = bc.get_flag()?;
    let passes = bc.get_unsigned(4)? as u8;
    Ok((flag_a, knockout, composite_source, on_top, passes))
}

pub fn read_drop_shadow_filter<S: Bytestream>(src: &mut S) -> Result<DropShadowFilter> {
    let color = read_rgba(src)?;
    let blur_x = read_fixed(src)?;
    let blur_y = read_fixed(src)?;
    let angle = read_fixed(src)?;
    let distance = read_fixed(src)?;
    let strength = read_fixed8(src)?;
    let (inner_shadow, knockout, composite_source, passes) = read_glow_flags(src)?;

    Ok(DropShadowFilter {
        color, blur_x, blur_y, angle, distance, strength, inner_shadow, knockout,
        composite_source, passes,
    })
}

pub fn read_blur_filter<S: Bytestream>(src: &mut S) -> Result<BlurFilter> {
    let blur_x = read_fixed(src)?;
    let blur_y = read_fixed(src)?;
    let mut bc = BitConsumer::new(&mut *src);
    let passes = bc.get_unsigned(5)? as u8;
    let _reserved = bc.get_unsigned(3)?;
    Ok(BlurFilter { blur_x, blur_y, passes })
}

pub fn read_glow_filter<S: Bytestream>(src: &mut S) -> Result<GlowFilter> {
    let color = read_rgba(src)?;
    let blur_x = read_fixed(src)?;
    let blur_y = read_fixed(src)?;
    let strength = read_fixed8(src)?;
    let (inner_glow, knockout, composite_source, passes) = read_glow_flags(src)?;
    Ok(GlowFilter { color, blur_x, blur_y, strength, inner_glow, knockout, composite_source, passes })
}

pub fn read_bevel_filter<S: Bytestream>(src: &mut S) -> Result<BevelFilter> {
    let shadow_color = read_rgba(src)?;
    let highlight_color = read_rgba(src)?;
    let blur_x = read_fixed(src)?;
    let blur_y = read_fixed(src)?;
    let angle = read_fixed(src)?;
    let distance = read_fixed(src)?;
    let strength = read_fixed8(src)?;
    let (inner_shadow, knockout, composite_source, on_top, passes) = read_bevel_flags(src)?;

    Ok(BevelFilter {
        shadow_color, highlight_color, blur_x, blur_y, angle, distance, strength,
        inner_shadow, knockout, composite_source, on_top, passes,
    })
}

fn read_gradient_glow_like<S: Bytestream>(src: &mut S) -> Result<GradientGlowFilter> {
    let num_colors = src.read_u8()?;

    let mut colors = Vec::with_capacity(num_colors as usize);
    for _ in 0..num_colors {
        colors.push(read_rgba(src)?);
    }

    let mut ratios = Vec::with_capacity(num_colors as usize);
    for _ in 0..num_colors {
        ratios.push(src.read_u8()?);
    }

    let blur_x = read_fixed(src)?;
    let blur_y = read_fixed(src)?;
    let angle = read_fixed(src)?;
    let distance = read_fixed(src)?;
    let strength = read_fixed8(src)?;
    let (inner_glow, knockout, composite_source, on_top, passes) = read_bevel_flags(src)?;

    Ok(GradientGlowFilter {
        colors, ratios, blur_x, blur_y, angle, distance, strength,
        inner_glow, knockout, composite_source, on_top, passes,
    })
}

pub fn read_gradient_glow_filter<S: Bytestream>(src: &mut S) -> Result<GradientGlowFilter> {
    read_gradient_glow_like(src)
}

pub fn read_gradient_bevel_filter<S: Bytestream>(src: &mut S) -> Result<GradientBevelFilter> {
    read_gradient_glow_like(src)
}

pub fn read_convolution_filter<S: Bytestream>(src: &mut S) -> Result<ConvolutionFilter> {
    let matrix_x = src.read_u8()?;
    let matrix_y = src.read_u8()?;
    let divisor = src.read_f32()?;
    let bias = src.read_f32()?;

    let count = matrix_x as usize * matrix_y as usize;
    let mut matrix = Vec::with_capacity(count);
    for _ in 0..count {
        matrix.push(src.read_f32()?);
    }

    let color = read_rgba(src)?;

    let mut bc = BitConsumer::new(&mut *src);
    let _reserved = bc.get_unsigned(6)?;
    let clamp = bc.get_flag()?;
    let preserve_alpha = bc.get_flag()?;

    Ok(ConvolutionFilter { matrix_x, matrix_y, divisor, bias, matrix, color, clamp, preserve_alpha })
}

pub fn read_color_matrix_filter<S: Bytestream>(src: &mut S) -> Result<ColorMatrixFilter> {
    let mut matrix = [0f32; 20];
    for slot in matrix.iter_mut() {
        *slot = src.read_f32()?;
    }
    Ok(ColorMatrixFilter { matrix })
}

/// Reads a `FILTERLIST`: a one-byte count followed by that many tagged `FILTER` records.
pub fn read_filter_list<S: Bytestream>(src: &mut S) -> Result<Vec<Filter>> {
    let count = src.read_u8()?;
    let mut filters = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let filter_id = src.read_u8()?;
        let filter = match filter_id {
            0 => Filter::DropShadow(read_drop_shadow_filter(src)?),
            1 => Filter::Blur(read_blur_filter(src)?),
            2 => Filter::Glow(read_glow_filter(src)?),
            3 => Filter::Bevel(read_bevel_filter(src)?),
            4 => Filter::GradientGlow(read_gradient_glow_filter(src)?),
            5 => Filter::Convolution(read_convolution_filter(src)?),
            6 => Filter::ColorMatrix(read_color_matrix_filter(src)?),
            7 => Filter::GradientBevel(read_gradient_bevel_filter(src)?),
            other => return crate::errors::unknown_name_error("Filter", u32::from(other), src.pos()),
        };
        filters.push(filter);
    }

    Ok(filters)
}

/// A single record inside a `CLIPACTIONS` block. The per-bit clip-event flags and the nested
/// action stream are not decoded into structured form here — see DESIGN.md's note on this gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipActionRecord {
    pub event_flags: u32,
    pub action_record: Vec<u8>,
}

/// A `CLIPACTIONS` block: an overall event-flag mask followed by a zero-terminated list of
/// per-event action records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipActions {
    pub all_event_flags: u32,
    pub records: Vec<ClipActionRecord>,
}

fn read_clip_event_flags<S: Bytestream>(src: &mut S, wide_flags: bool) -> Result<u32> {
    if wide_flags { Ok(src.read_u32()?) } else { Ok(u32::from(src.read_u16()?)) }
}

/// Reads a `CLIPACTIONS` block. `wide_flags` selects the 4-byte event-flag encoding used from
/// SWF6 onward, versus the 2-byte encoding used by earlier versions.
pub fn read_clip_actions<S: Bytestream>(src: &mut S, wide_flags: bool) -> Result<ClipActions> {
    let _reserved = src.read_u16()?;
    let all_event_flags = read_clip_event_flags(src, wide_flags)?;

    let mut records = Vec::new();
    loop {
        let event_flags = read_clip_event_flags(src, wide_flags)?;
        if event_flags == 0 {
            break;
        }

        let action_record_size = src.read_u32()?;
        let action_record = src.read_vec_bytes(action_record_size as usize)?;
        records.push(ClipActionRecord { event_flags, action_record });
    }

    Ok(ClipActions { all_event_flags, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufStream;

    #[test]
    fn rect_short_field_matches_reference_scenario() {
        // 1b ae 80 -> nbits=3, fields (3, 5, 3, 5).
        let mut src = BufStream::new(&[0x1b, 0xae, 0x80]);
        let rect = read_rect(&mut src).unwrap();
        assert_eq!((rect.x_min, rect.x_max, rect.y_min, rect.y_max), (3, 5, 3, 5));
    }

    #[test]
    fn rect_long_field_matches_reference_scenario() {
        // 70 00 0a 8c 00 00 da c0 -> nbits=14, fields (0, 5400, 0, 7000).
        let bytes = [0x70u8, 0x00, 0x0a, 0x8c, 0x00, 0x00, 0xda, 0xc0];
        let mut src = BufStream::new(&bytes);
        let rect = read_rect(&mut src).unwrap();
        assert_eq!((rect.x_min, rect.x_max, rect.y_min, rect.y_max), (0, 5400, 0, 7000));
    }

    #[test]
    fn rgb_and_rgba_read_byte_order() {
        let mut src = BufStream::new(&[0x10, 0x20, 0x30]);
        let rgb = read_rgb(&mut src).unwrap();
        assert_eq!((rgb.red, rgb.green, rgb.blue), (0x10, 0x20, 0x30));

        let mut src = BufStream::new(&[0x10, 0x20, 0x30, 0x40]);
        let rgba = read_rgba(&mut src).unwrap();
        assert_eq!((rgba.red, rgba.green, rgba.blue, rgba.alpha), (0x10, 0x20, 0x30, 0x40));
    }

    #[test]
    fn matrix_with_no_scale_or_rotate_reads_translate_only() {
        // HasScale(0) HasRotate(0) nTranslate(5 bits)=0 translateX(0 bits) translateY(0 bits).
        let mut src = BufStream::new(&[0b0000_0000]);
        let matrix = read_matrix(&mut src).unwrap();
        assert!(matrix.scale.is_none());
        assert!(matrix.rotate_skew.is_none());
        assert_eq!((matrix.translate_x, matrix.translate_y), (0, 0));
    }

    #[test]
    fn clip_actions_terminates_on_zero_event_flags() {
        // Reserved(u16)=0, AllEventFlags(u16, wide=false)=0xFFFF, then terminator 0x0000.
        let bytes = [0x00u8, 0x00, 0xff, 0xff, 0x00, 0x00];
        let mut src = BufStream::new(&bytes);
        let clip_actions = read_clip_actions(&mut src, false).unwrap();
        assert_eq!(clip_actions.all_event_flags, 0xffff);
        assert!(clip_actions.records.is_empty());
    }

    #[test]
    fn filter_list_rejects_unknown_filter_id() {
        let mut src = BufStream::new(&[0x01, 0xff]); // count=1, unknown filter id 0xff
        assert!(read_filter_list(&mut src).is_err());
    }
}
