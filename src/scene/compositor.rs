//! Camera policy and surface placement.

use glam::Vec2;
use log::debug;

use super::camera::{CameraState, Viewport};
use crate::asset::AssetKind;

/// Uniform scale of the group holding a model's scene graph.
pub const MODEL_SCALE: f32 = 200.0;

/// Which camera pose the resident surface calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Video or image on a screen-facing quad
    Flat,
    /// A model, or nothing loaded yet
    Spatial,
}

impl FramingMode {
    pub fn for_surface(kind: Option<AssetKind>) -> Self {
        match kind {
            Some(kind) if kind.is_flat() => FramingMode::Flat,
            _ => FramingMode::Spatial,
        }
    }

    fn camera(self) -> CameraState {
        match self {
            FramingMode::Flat => CameraState::flat(),
            FramingMode::Spatial => CameraState::spatial(),
        }
    }
}

/// World-space size of a flat surface's quad.
///
/// With fitting on and known intrinsic dimensions the quad keeps the
/// source aspect ratio and covers the viewport. Otherwise it matches the
/// viewport exactly.
pub fn surface_scale(intrinsic: Option<(u32, u32)>, viewport: Viewport, fit_to_aspect: bool) -> Vec2 {
    let view = Vec2::new(viewport.width as f32, viewport.height as f32);
    let (w, h) = match intrinsic {
        Some((w, h)) if fit_to_aspect && w > 0 && h > 0 => (w as f32, h as f32),
        _ => return view,
    };
    let k = if viewport.aspect() > w / h {
        view.x / w
    } else {
        view.y / h
    };
    Vec2::new(w * k, h * k)
}

/// Owns the camera. The pose is only written when the framing mode
/// changes, so per-frame settings changes leave it alone.
#[derive(Debug)]
pub struct FrameCompositor {
    camera: CameraState,
    mode: Option<FramingMode>,
    snaps: u64,
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self {
            camera: CameraState::spatial(),
            mode: None,
            snaps: 0,
        }
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Mutable access for an external camera controller. Edits survive
    /// until the next mode change.
    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn mode(&self) -> Option<FramingMode> {
        self.mode
    }

    /// Number of times the camera has been snapped to a preset pose.
    pub fn snap_count(&self) -> u64 {
        self.snaps
    }

    /// Apply the camera policy for the resident surface kind. Returns true
    /// when the camera was snapped. The first call always snaps.
    pub fn update(&mut self, kind: Option<AssetKind>) -> bool {
        let mode = FramingMode::for_surface(kind);
        if self.mode == Some(mode) {
            return false;
        }
        self.camera = mode.camera();
        self.mode = Some(mode);
        self.snaps += 1;
        debug!("Camera snapped to {:?} framing", mode);
        true
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new()
    }
}
