//! Luminance using the ITU-R BT.601 formula.

use crate::frame::Rgb;

/// Perceptual luminance of a color: Y = 0.299*R + 0.587*G + 0.114*B.
///
/// Integer math with coefficients scaled by 1000 (299 + 587 + 114 = 1000),
/// so white maps to exactly 255.
#[inline]
pub fn luma(color: Rgb) -> u8 {
    let r = color.r as u32;
    let g = color.g as u32;
    let b = color.b as u32;
    ((299 * r + 587 * g + 114 * b) / 1000) as u8
}

/// The grey color with the same luminance as `color`.
#[inline]
pub fn to_grey(color: Rgb) -> Rgb {
    let y = luma(color);
    Rgb::new(y, y, y)
}
