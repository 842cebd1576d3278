//! Keyframe animation of model node transforms.

mod clip;
mod driver;

pub use clip::{AnimationClip, Interpolation, Track, TrackValues};
pub use driver::AnimationDriver;
