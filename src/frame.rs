//! Pixel buffers shared by the loader, rasterizer and glyph effect.

use std::path::Path;

/// RGB color used for settings and per-cell samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation towards `other` by `t` in `[0, 1]`.
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(lerp(self.r, other.r), lerp(self.g, other.g), lerp(self.b, other.b))
    }

    /// Multiply every channel by `factor`, saturating at 255.
    pub fn scale(self, factor: f32) -> Rgb {
        let f = factor.max(0.0);
        let s = |c: u8| (c as f32 * f).round().min(255.0) as u8;
        Rgb::new(s(self.r), s(self.g), s(self.b))
    }
}

/// An RGBA8 framebuffer in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw pixel data, 4 bytes per pixel
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Create a fully transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * Self::BYTES_PER_PIXEL],
            width,
            height,
        }
    }

    /// Create a frame filled with an opaque color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        let mut frame = Self::new(width, height);
        frame.clear(color, 255);
        frame
    }

    /// Wrap existing RGBA bytes. Returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * Self::BYTES_PER_PIXEL {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn clear(&mut self, color: Rgb, alpha: u8) {
        for px in self.data.chunks_exact_mut(Self::BYTES_PER_PIXEL) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = alpha;
        }
    }

    /// Resize the buffer, discarding content when the dimensions change.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL
    }

    /// Color at `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some(Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    #[inline]
    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i] = color.r;
        self.data[i + 1] = color.g;
        self.data[i + 2] = color.b;
        self.data[i + 3] = 255;
    }

    /// Sample with normalized coordinates, nearest neighbour, clamped to edge.
    /// `v = 0` is the top row.
    pub fn sample_nearest(&self, u: f32, v: f32) -> Rgb {
        if self.is_empty() {
            return Rgb::BLACK;
        }
        let x = (u.clamp(0.0, 1.0) * self.width as f32) as u32;
        let y = (v.clamp(0.0, 1.0) * self.height as f32) as u32;
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let i = self.offset(x, y);
        Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    /// Write the frame as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_transparent() {
        let frame = Frame::new(2, 3);
        assert_eq!(frame.data.len(), 2 * 3 * 4);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_rgba_rejects_bad_length() {
        assert!(Frame::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Frame::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_put_and_read_back() {
        let mut frame = Frame::new(4, 4);
        frame.put(1, 2, Rgb::new(10, 20, 30));
        assert_eq!(frame.rgb_at(1, 2), Some(Rgb::new(10, 20, 30)));
        assert_eq!(frame.rgb_at(4, 0), None);
    }

    #[test]
    fn test_sample_nearest_clamps() {
        let mut frame = Frame::new(2, 1);
        frame.put(0, 0, Rgb::new(1, 1, 1));
        frame.put(1, 0, Rgb::new(9, 9, 9));
        assert_eq!(frame.sample_nearest(-1.0, 0.5), Rgb::new(1, 1, 1));
        assert_eq!(frame.sample_nearest(1.0, 0.5), Rgb::new(9, 9, 9));
    }

    #[test]
    fn test_mix_endpoints() {
        let a = Rgb::new(0, 0, 0);
        let b = Rgb::new(200, 100, 50);
        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);
        assert_eq!(a.mix(b, 0.5), Rgb::new(100, 50, 25));
    }
}
