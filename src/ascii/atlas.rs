//! Character-set texture: one coverage bitmap per glyph ordinal.
//!
//! Built-in glyphs come from the `font8x8` bitmap tables, scaled to the
//! requested font size. A custom font supplied at runtime is rasterized
//! with `fontdue` instead. Builds run on the blocking pool and the most
//! recently requested key wins.

use std::sync::Arc;

use font8x8::legacy::{BASIC_LEGACY, BLOCK_LEGACY, BOX_LEGACY, LATIN_LEGACY};
use log::{debug, info};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::charset::Alphabet;
use crate::error::TextureNotReady;

/// Smallest and largest glyph bitmap side in pixels.
pub const MIN_GLYPH_SIZE: u32 = 8;
pub const MAX_GLYPH_SIZE: u32 = 256;

/// Fraction of the glyph cell above the baseline for custom fonts.
const BASELINE: f32 = 0.8;

/// Errors raised while preparing glyph sources.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("Failed to parse font: {0}")]
    FontParse(String),
}

/// A parsed custom font together with its load generation.
pub struct GlyphFont {
    font: fontdue::Font,
    generation: u64,
}

impl GlyphFont {
    pub fn from_bytes(bytes: &[u8], generation: u64) -> Result<Self, AtlasError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| AtlasError::FontParse(e.to_string()))?;
        Ok(Self { font, generation })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphFont")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Inputs that decide the atlas content. A change in any of them triggers
/// a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasKey {
    pub alphabet: Alphabet,
    pub font_size: u32,
    /// 0 for the built-in bitmap font
    pub font_generation: u64,
}

/// Coverage bitmaps for every glyph of an alphabet, all the same square size.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    key: AtlasKey,
    glyph_size: u32,
    coverage: Vec<Vec<u8>>,
}

impl GlyphAtlas {
    /// Rasterize every glyph of `key.alphabet`.
    pub fn build(key: AtlasKey, font: Option<&GlyphFont>) -> Self {
        let glyph_size = key.font_size.clamp(MIN_GLYPH_SIZE, MAX_GLYPH_SIZE);
        let coverage = key
            .alphabet
            .glyphs()
            .iter()
            .map(|&ch| match font {
                Some(font) => rasterize_font(font, ch, glyph_size),
                None => rasterize_bitmap(ch, glyph_size),
            })
            .collect();
        Self {
            key,
            glyph_size,
            coverage,
        }
    }

    pub fn key(&self) -> &AtlasKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.coverage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty()
    }

    pub fn glyph_size(&self) -> u32 {
        self.glyph_size
    }

    /// Character at ordinal `index`.
    pub fn character(&self, index: usize) -> Option<char> {
        self.key.alphabet.get(index)
    }

    /// Nearest-neighbour coverage of glyph `index` at normalized `(u, v)`,
    /// `v = 0` being the top edge. Out-of-range indices have no coverage.
    #[inline]
    pub fn coverage(&self, index: usize, u: f32, v: f32) -> u8 {
        let Some(bitmap) = self.coverage.get(index) else {
            return 0;
        };
        let size = self.glyph_size;
        let x = ((u.clamp(0.0, 1.0) * size as f32) as u32).min(size - 1);
        let y = ((v.clamp(0.0, 1.0) * size as f32) as u32).min(size - 1);
        bitmap[(y * size + x) as usize]
    }
}

fn bitmap_rows(ch: char) -> [u8; 8] {
    let code = ch as usize;
    match code {
        0x0000..=0x007F => BASIC_LEGACY[code],
        0x00A0..=0x00FF => LATIN_LEGACY[code - 0x00A0],
        0x2500..=0x257F => BOX_LEGACY[code - 0x2500],
        0x2580..=0x259F => BLOCK_LEGACY[code - 0x2580],
        _ => BASIC_LEGACY[b'?' as usize],
    }
}

fn rasterize_bitmap(ch: char, size: u32) -> Vec<u8> {
    let rows = bitmap_rows(ch);
    let mut out = vec![0u8; (size * size) as usize];
    for y in 0..size {
        let bits = rows[(y * 8 / size) as usize];
        for x in 0..size {
            let bit = x * 8 / size;
            if (bits >> bit) & 0x01 != 0 {
                out[(y * size + x) as usize] = 255;
            }
        }
    }
    out
}

fn rasterize_font(font: &GlyphFont, ch: char, size: u32) -> Vec<u8> {
    let mut out = vec![0u8; (size * size) as usize];
    let px = size as f32 * BASELINE;
    let (metrics, bitmap) = font.font.rasterize(ch, px);
    if metrics.width == 0 || metrics.height == 0 {
        return out;
    }

    let baseline = (size as f32 * BASELINE).round() as i32;
    // Centre horizontally on the advance so narrow glyphs do not hug the left edge.
    let left = ((size as f32 - metrics.advance_width) / 2.0).round() as i32 + metrics.xmin;
    let top = baseline - (metrics.ymin + metrics.height as i32);

    for gy in 0..metrics.height {
        let y = top + gy as i32;
        if y < 0 || y >= size as i32 {
            continue;
        }
        for gx in 0..metrics.width {
            let x = left + gx as i32;
            if x < 0 || x >= size as i32 {
                continue;
            }
            out[(y as u32 * size + x as u32) as usize] = bitmap[gy * metrics.width + gx];
        }
    }
    out
}

/// Owns the current atlas and schedules rebuilds on the blocking pool.
pub struct AtlasBuilder {
    handle: Handle,
    font: Option<Arc<GlyphFont>>,
    font_generation: u64,
    requested: Option<AtlasKey>,
    current: Option<Arc<GlyphAtlas>>,
    tx: mpsc::UnboundedSender<Arc<GlyphAtlas>>,
    rx: mpsc::UnboundedReceiver<Arc<GlyphAtlas>>,
}

impl AtlasBuilder {
    pub fn new(handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle,
            font: None,
            font_generation: 0,
            requested: None,
            current: None,
            tx,
            rx,
        }
    }

    /// Replace the glyph source with a custom font. The next [`ensure`]
    /// call schedules a rebuild.
    ///
    /// [`ensure`]: AtlasBuilder::ensure
    pub fn set_font(&mut self, bytes: &[u8]) -> Result<(), AtlasError> {
        let font = GlyphFont::from_bytes(bytes, self.font_generation + 1)?;
        self.font_generation = font.generation();
        self.font = Some(Arc::new(font));
        info!("Custom font loaded (generation {})", self.font_generation);
        Ok(())
    }

    /// Schedule a build if the inputs differ from the last request.
    pub fn ensure(&mut self, alphabet: &Alphabet, font_size: u32) {
        let key = AtlasKey {
            alphabet: alphabet.clone(),
            font_size,
            font_generation: self.font.as_ref().map_or(0, |f| f.generation()),
        };
        if self.requested.as_ref() == Some(&key) {
            return;
        }
        self.requested = Some(key.clone());

        let font = self.font.clone();
        let tx = self.tx.clone();
        self.handle.spawn_blocking(move || {
            let atlas = GlyphAtlas::build(key, font.as_deref());
            let _ = tx.send(Arc::new(atlas));
        });
    }

    /// Install finished builds. Returns true if the current atlas changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(atlas) = self.rx.try_recv() {
            changed |= self.install(atlas);
        }
        changed
    }

    /// Wait until the most recently requested atlas is installed.
    pub async fn ready(&mut self) {
        while !self.is_current() {
            match self.rx.recv().await {
                Some(atlas) => {
                    self.install(atlas);
                }
                None => return,
            }
        }
    }

    fn is_current(&self) -> bool {
        match (&self.requested, &self.current) {
            (None, _) => true,
            (Some(key), Some(atlas)) => atlas.key() == key,
            (Some(_), None) => false,
        }
    }

    fn install(&mut self, atlas: Arc<GlyphAtlas>) -> bool {
        if self.requested.as_ref() != Some(atlas.key()) {
            debug!("Discarding stale glyph atlas build");
            return false;
        }
        info!(
            "Glyph atlas ready: {} glyphs at {}px",
            atlas.len(),
            atlas.glyph_size()
        );
        self.current = Some(atlas);
        true
    }

    pub fn current(&self) -> Option<&GlyphAtlas> {
        self.current.as_deref()
    }

    /// The current atlas, or [`TextureNotReady`] before the first build lands.
    pub fn atlas(&self) -> Result<&GlyphAtlas, TextureNotReady> {
        self.current().ok_or(TextureNotReady)
    }
}
