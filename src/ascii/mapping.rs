//! Luminance to glyph index mapping.

/// Number of glyph levels actually used for a given atlas and limit.
///
/// Never less than one, so an index of `0` is always valid.
#[inline]
pub fn effective_levels(character_limit: usize, atlas_len: usize) -> usize {
    character_limit.min(atlas_len).max(1)
}

/// Quantize a luminance value to a glyph ordinal in `0..levels`.
///
/// Lower luminance maps to earlier glyphs. With `invert` the order is
/// reversed, so `invert` applied twice yields the original index.
///
/// # Example
/// ```ignore
/// assert_eq!(glyph_index(255, 16, false), 15);
/// assert_eq!(glyph_index(255, 16, true), 0);
/// ```
#[inline]
pub fn glyph_index(luma: u8, levels: usize, invert: bool) -> usize {
    let levels = levels.max(1);
    let idx = (luma as usize * (levels - 1)) / 255;
    if invert {
        levels - 1 - idx
    } else {
        idx
    }
}
