//! Falling-code overlay: per-column trails driven by a hash of the column
//! and the effect time.

/// Glyph changes per second inside a trail.
const GLYPH_RATE: f32 = 8.0;

/// Slowest and fastest trail speed in rows per second.
const MIN_SPEED: f32 = 4.0;
const MAX_SPEED: f32 = 16.0;

/// Integer hash with good avalanche on small inputs.
#[inline]
pub fn hash2(a: u32, b: u32) -> u32 {
    let mut h = a.wrapping_mul(0x9E37_79B9) ^ b.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^= h >> 16;
    h
}

/// Brightness of the trail covering `(col, row)` at `time`, in `[0, 1]`.
///
/// The head of the trail is 1 and the tail fades linearly to 0.
pub fn trail_intensity(col: u32, row: u32, rows: u32, time: f32) -> f32 {
    if rows == 0 {
        return 0.0;
    }
    let seed = hash2(col, 0x5EED);
    let speed = MIN_SPEED + (seed % 1024) as f32 / 1023.0 * (MAX_SPEED - MIN_SPEED);
    let trail = 4 + (seed >> 10) % (rows / 2 + 4);
    let period = (rows + trail) as f32;
    let offset = ((seed >> 20) % (rows + trail)) as f32;

    let head = (time.max(0.0) * speed + offset) % period;
    let dist = head - row as f32;
    if dist < 0.0 || dist >= trail as f32 {
        0.0
    } else {
        1.0 - dist / trail as f32
    }
}

/// Pseudo-random glyph ordinal for a cell, stable within one time step.
pub fn glyph_at(col: u32, row: u32, time: f32, levels: usize) -> usize {
    let step = (time.max(0.0) * GLYPH_RATE) as u32;
    (hash2(hash2(col, row), step) as usize) % levels.max(1)
}
