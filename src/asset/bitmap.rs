//! Still image decoding.

use crate::error::LoadError;
use crate::frame::Frame;

/// A decoded still image.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    bitmap: Frame,
}

impl ImageSurface {
    /// Decode PNG, JPEG, WebP (and any other format the `image` crate was
    /// built with) into RGBA.
    pub fn decode(bytes: &[u8], label: &str) -> Result<Self, LoadError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| LoadError::decode("image", label, e))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::decode("image", label, "image has no pixels"));
        }
        let bitmap = Frame::from_rgba(width, height, rgba.into_raw())
            .ok_or_else(|| LoadError::decode("image", label, "unexpected pixel buffer size"))?;
        Ok(Self { bitmap })
    }

    pub fn from_frame(bitmap: Frame) -> Self {
        Self { bitmap }
    }

    pub fn bitmap(&self) -> &Frame {
        &self.bitmap
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height
    }
}
