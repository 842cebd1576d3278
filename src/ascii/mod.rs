//! Glyph mosaic pipeline for rendered frames.
//!
//! 1. **Sampling** - average color per square cell
//! 2. **Luminance** - BT.601 luma, optional greyscale
//! 3. **Mapping** - luma to glyph ordinal, optional inversion
//! 4. **Composition** - glyph coverage from the [`GlyphAtlas`] blended over
//!    the background or the cell color
//!
//! # Character Sets
//!
//! Alphabet presets are available via [`CharSet`]:
//! - `Aniso` - the default 16-glyph alphabet
//! - `Standard` - 10-level ASCII density ramp
//! - `Blocks` - Unicode block characters
//! - `Minimal` - 4-level clean look

mod atlas;
mod charset;
mod dimensions;
mod downsample;
mod effect;
mod grayscale;
mod mapping;
mod matrix;

pub use atlas::{AtlasBuilder, AtlasError, AtlasKey, GlyphAtlas, GlyphFont, MAX_GLYPH_SIZE, MIN_GLYPH_SIZE};
pub use charset::{Alphabet, CharSet, ANISO_CHARACTERS, BLOCKS_CHARSET, MINIMAL_CHARSET, STANDARD_CHARSET};
pub use dimensions::{cell_size, grid_dimensions};
pub use downsample::downsample_colors_into;
pub use effect::{GlyphCell, GlyphFrame, GlyphGrid, GlyphMosaicEffect};
pub use grayscale::{luma, to_grey};
pub use mapping::{effective_levels, glyph_index};
