//! Orthographic camera state.

use glam::{Mat4, Quat, Vec3};

/// Near clipping plane distance.
pub const NEAR: f32 = 0.1;
/// Far clipping plane distance.
pub const FAR: f32 = 10_000.0;

pub const FLAT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);
pub const SPATIAL_POSITION: Vec3 = Vec3::new(500.0, 250.0, 500.0);

/// Size of the visible area in viewport pixels. At zoom 1 one world unit
/// covers one viewport pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Framebuffer size at the given device pixel ratio, at least 1x1.
    pub fn device_size(&self, pixel_ratio: f32) -> (u32, u32) {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let scale = |v: u32| ((v as f32 * ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub rotation: Quat,
    pub zoom: f32,
}

impl CameraState {
    /// Facing down -Z from just in front of the origin.
    pub fn flat() -> Self {
        Self {
            position: FLAT_POSITION,
            rotation: Quat::IDENTITY,
            zoom: 1.0,
        }
    }

    /// Raised three-quarter view looking at the origin.
    pub fn spatial() -> Self {
        Self {
            position: SPATIAL_POSITION,
            rotation: look_at(SPATIAL_POSITION, Vec3::ZERO),
            zoom: 1.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// World to camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// Orthographic projection covering `viewport` in world units.
    pub fn projection(&self, viewport: Viewport) -> Mat4 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        let half_w = viewport.width as f32 / (2.0 * zoom);
        let half_h = viewport.height as f32 / (2.0 * zoom);
        Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, NEAR, FAR)
    }

    pub fn view_projection(&self, viewport: Viewport) -> Mat4 {
        self.projection(viewport) * self.view_matrix()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::spatial()
    }
}

/// Rotation that points -Z from `eye` towards `target` with +Y up.
fn look_at(eye: Vec3, target: Vec3) -> Quat {
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    Quat::from_mat4(&view.inverse()).normalize()
}
