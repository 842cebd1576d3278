//! The renderable result of a load.

use super::bitmap::ImageSurface;
use super::classify::AssetKind;
use super::model::ModelSurface;
use super::video::VideoSurface;

/// Exactly one of these is resident at a time. Dropping it releases the
/// decoded data and, for video, stops the decoder process.
#[derive(Debug)]
pub enum LoadedSurface {
    Model(ModelSurface),
    Video(VideoSurface),
    Image(ImageSurface),
}

impl LoadedSurface {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadedSurface::Model(_) => AssetKind::Model,
            LoadedSurface::Video(_) => AssetKind::Video,
            LoadedSurface::Image(_) => AssetKind::Image,
        }
    }

    /// Native pixel size of flat surfaces. Models have none.
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        match self {
            LoadedSurface::Model(_) => None,
            LoadedSurface::Video(v) => Some((v.width(), v.height())),
            LoadedSurface::Image(i) => Some((i.width(), i.height())),
        }
    }

    pub fn as_model(&self) -> Option<&ModelSurface> {
        match self {
            LoadedSurface::Model(m) => Some(m),
            _ => None,
        }
    }
}
