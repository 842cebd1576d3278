//! The glyph mosaic post-process.
//!
//! A rendered frame is cut into square cells. Each cell is reduced to its
//! average color, the color's luminance picks a glyph from the atlas, and
//! the glyph is drawn back over the cell at the input resolution.

use crate::frame::{Frame, Rgb};
use crate::settings::EffectSettings;

use super::atlas::GlyphAtlas;
use super::downsample::downsample_colors_into;
use super::grayscale::{luma, to_grey};
use super::mapping::{effective_levels, glyph_index};
use super::matrix;

/// One cell of the glyph grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    /// Ordinal into the atlas
    pub index: usize,
    pub glyph: char,
    /// Sampled color after greyscale
    pub color: Rgb,
}

/// The glyph selection of one frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    pub cols: u32,
    pub rows: u32,
    pub cells: Vec<GlyphCell>,
}

impl GlyphGrid {
    pub fn get(&self, col: u32, row: u32) -> Option<&GlyphCell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get((row * self.cols + col) as usize)
    }

    /// The grid as lines of text, one line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows as usize);
        for (i, row) in self.cells.chunks(self.cols.max(1) as usize).enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.extend(row.iter().map(|c| c.glyph));
        }
        out
    }
}

/// Result of one effect pass.
#[derive(Debug, Clone)]
pub struct GlyphFrame {
    /// Final pixels, same size as the input frame
    pub frame: Frame,
    /// `None` when the frame was passed through without an atlas
    pub grid: Option<GlyphGrid>,
    /// One pixel per cell with the sampled cell color
    pub preview: Frame,
}

/// Stateless apart from a reusable sampling buffer.
#[derive(Debug, Default)]
pub struct GlyphMosaicEffect {
    cells: Vec<Rgb>,
}

impl GlyphMosaicEffect {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(&mut self, input: &Frame, settings: &EffectSettings) -> (u32, u32) {
        let dims = downsample_colors_into(input, settings.cell_size(), &mut self.cells);
        if settings.greyscale {
            for c in self.cells.iter_mut() {
                *c = to_grey(*c);
            }
        }
        dims
    }

    /// The low-resolution channel: one pixel per cell.
    pub fn preview(&mut self, input: &Frame, settings: &EffectSettings) -> Frame {
        let (cols, rows) = self.sample(input, settings);
        self.preview_frame(cols, rows)
    }

    fn preview_frame(&self, cols: u32, rows: u32) -> Frame {
        let mut preview = Frame::new(cols, rows);
        for (i, &color) in self.cells.iter().enumerate() {
            let i = i as u32;
            preview.put(i % cols, i / cols, color);
        }
        preview
    }

    /// Run the mosaic over `input`.
    ///
    /// `elapsed` is the wall-clock effect time in seconds; the settings'
    /// override time takes precedence. Without an atlas (or with an empty
    /// one) the input is returned unchanged.
    pub fn apply(
        &mut self,
        input: &Frame,
        atlas: Option<&GlyphAtlas>,
        settings: &EffectSettings,
        elapsed: f32,
    ) -> GlyphFrame {
        let (cols, rows) = self.sample(input, settings);
        let preview = self.preview_frame(cols, rows);

        let atlas = match atlas {
            Some(atlas) if !atlas.is_empty() => atlas,
            _ => {
                return GlyphFrame {
                    frame: input.clone(),
                    grid: None,
                    preview,
                }
            }
        };

        let levels = effective_levels(settings.character_limit, atlas.len());
        let time = settings.override_time.unwrap_or(elapsed);
        let cell = settings.cell_size();

        let mut grid = GlyphGrid {
            cols,
            rows,
            cells: Vec::with_capacity(self.cells.len()),
        };
        // Per-cell stroke weight: 1 outside matrix mode.
        let mut weights = Vec::with_capacity(self.cells.len());

        for (i, &color) in self.cells.iter().enumerate() {
            let cx = i as u32 % cols.max(1);
            let cy = i as u32 / cols.max(1);
            let (index, weight) = if settings.matrix {
                let intensity = matrix::trail_intensity(cx, cy, rows, time);
                let intensity = if settings.invert { 1.0 - intensity } else { intensity };
                (matrix::glyph_at(cx, cy, time, levels), intensity)
            } else {
                (glyph_index(luma(color), levels, settings.invert), 1.0)
            };
            grid.cells.push(GlyphCell {
                index,
                glyph: atlas.character(index).unwrap_or(' '),
                color,
            });
            weights.push(weight);
        }

        let mut out = Frame::new(input.width, input.height);
        let inv_cell = 1.0 / cell as f32;
        for y in 0..input.height {
            let cy = y / cell;
            let v = ((y % cell) as f32 + 0.5) * inv_cell;
            for x in 0..input.width {
                let cx = x / cell;
                let u = ((x % cell) as f32 + 0.5) * inv_cell;
                let i = (cy * cols + cx) as usize;
                let glyph = &grid.cells[i];
                let coverage = atlas.coverage(glyph.index, u, v) as f32 / 255.0 * weights[i];
                out.put(x, y, compose(glyph.color, coverage, settings));
            }
        }

        GlyphFrame {
            frame: out,
            grid: Some(grid),
            preview,
        }
    }
}

/// Blend the glyph stroke over the cell base for one pixel.
#[inline]
fn compose(cell: Rgb, coverage: f32, settings: &EffectSettings) -> Rgb {
    if settings.fill_pixels {
        let stroke = settings
            .override_color
            .unwrap_or_else(|| cell.mix(Rgb::WHITE, 0.5));
        cell.mix(stroke, coverage)
    } else {
        let stroke = settings.override_color.unwrap_or(cell);
        settings.background.mix(stroke, coverage)
    }
}
