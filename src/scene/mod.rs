//! Camera, surface placement and rasterization.

mod camera;
mod compositor;
mod raster;

pub use camera::{CameraState, Viewport, FAR, FLAT_POSITION, NEAR, SPATIAL_POSITION};
pub use compositor::{surface_scale, FrameCompositor, FramingMode, MODEL_SCALE};
pub use raster::{normal_color, Raster};
