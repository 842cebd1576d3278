//! Per-cell color sampling for the glyph grid.

use crate::frame::{Frame, Rgb};

use super::dimensions::{grid_dimensions, MIN_CELL_SIZE};

/// Average the colors of every `cell` x `cell` block of `frame`.
///
/// Edge cells are clipped to the frame, so only pixels that exist are
/// averaged. Alpha is ignored.
///
/// # Arguments
/// * `frame` - Source framebuffer
/// * `cell` - Cell side in pixels
/// * `buffer` - Output buffer, cleared and refilled in row-major order
///
/// # Returns
/// The grid dimensions as `(cols, rows)`.
pub fn downsample_colors_into(frame: &Frame, cell: u32, buffer: &mut Vec<Rgb>) -> (u32, u32) {
    buffer.clear();

    let cell = cell.max(MIN_CELL_SIZE);
    let (cols, rows) = grid_dimensions(frame.width, frame.height, cell);
    if cols == 0 || rows == 0 {
        return (0, 0);
    }
    buffer.reserve(cols as usize * rows as usize);

    let stride = frame.width as usize * Frame::BYTES_PER_PIXEL;
    for cy in 0..rows {
        let start_y = cy * cell;
        let end_y = (start_y + cell).min(frame.height);
        for cx in 0..cols {
            let start_x = cx * cell;
            let end_x = (start_x + cell).min(frame.width);

            let mut sum = [0u64; 3];
            for py in start_y..end_y {
                let row = py as usize * stride;
                let from = row + start_x as usize * Frame::BYTES_PER_PIXEL;
                let to = row + end_x as usize * Frame::BYTES_PER_PIXEL;
                for px in frame.data[from..to].chunks_exact(Frame::BYTES_PER_PIXEL) {
                    sum[0] += px[0] as u64;
                    sum[1] += px[1] as u64;
                    sum[2] += px[2] as u64;
                }
            }

            let count = ((end_x - start_x) as u64 * (end_y - start_y) as u64).max(1);
            buffer.push(Rgb::new(
                (sum[0] / count) as u8,
                (sum[1] / count) as u8,
                (sum[2] / count) as u8,
            ));
        }
    }

    (cols, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_frame_averages_to_itself() {
        let frame = Frame::filled(16, 16, Rgb::new(10, 200, 30));
        let mut cells = Vec::new();
        let dims = downsample_colors_into(&frame, 8, &mut cells);
        assert_eq!(dims, (2, 2));
        assert!(cells.iter().all(|&c| c == Rgb::new(10, 200, 30)));
    }

    #[test]
    fn test_average_of_split_cell() {
        let mut frame = Frame::filled(2, 1, Rgb::BLACK);
        frame.put(1, 0, Rgb::new(200, 100, 50));
        let mut cells = Vec::new();
        downsample_colors_into(&frame, 2, &mut cells);
        assert_eq!(cells, vec![Rgb::new(100, 50, 25)]);
    }

    #[test]
    fn test_edge_cells_are_clipped() {
        // 3 pixels wide with 2 pixel cells: the last cell covers one column.
        let mut frame = Frame::filled(3, 2, Rgb::BLACK);
        frame.put(2, 0, Rgb::WHITE);
        frame.put(2, 1, Rgb::WHITE);
        let mut cells = Vec::new();
        let dims = downsample_colors_into(&frame, 2, &mut cells);
        assert_eq!(dims, (2, 1));
        assert_eq!(cells[0], Rgb::BLACK);
        assert_eq!(cells[1], Rgb::WHITE);
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::new(0, 0);
        let mut cells = vec![Rgb::WHITE];
        assert_eq!(downsample_colors_into(&frame, 8, &mut cells), (0, 0));
        assert!(cells.is_empty());
    }
}
