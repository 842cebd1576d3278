//! Cell grid dimensions for a framebuffer and granularity.

/// Minimum side of a sampling cell in device pixels.
pub const MIN_CELL_SIZE: u32 = 1;

/// Resolve the cell side in device pixels.
///
/// Granularity is given in logical pixels and scaled by the device pixel
/// ratio so that the visual cell size does not depend on the display.
/// Non-positive or non-finite input collapses to [`MIN_CELL_SIZE`].
pub fn cell_size(granularity: f32, pixel_ratio: f32) -> u32 {
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    };
    let scaled = granularity * ratio;
    if !scaled.is_finite() || scaled < MIN_CELL_SIZE as f32 {
        return MIN_CELL_SIZE;
    }
    scaled.round() as u32
}

/// Number of (columns, rows) needed to cover a `width` x `height` frame.
///
/// Edge cells may be partially outside the frame.
pub fn grid_dimensions(width: u32, height: u32, cell: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let cell = cell.max(MIN_CELL_SIZE);
    (width.div_ceil(cell), height.div_ceil(cell))
}
