//! aniso-ascii library crate.
//!
//! Loads a model, video or image, renders it on the CPU and re-samples the
//! frame into a mosaic of glyphs chosen by cell luminance.
//!
//! The pieces, in tick order:
//! - [`settings`] - the per-frame [`settings::EffectSettings`] record
//! - [`asset`] - classification and asynchronous loading
//! - [`animation`] - clip playback for models
//! - [`scene`] - camera policy, placement and rasterization
//! - [`ascii`] - the glyph mosaic effect and its atlas
//! - [`renderer`] - the loop tying them together

pub mod animation;
pub mod ascii;
pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use asset::{AssetKind, AssetRef};
pub use error::LoadError;
pub use renderer::{CanvasHandle, Renderer};
pub use settings::{EffectSettings, SettingsChannel, SettingsPatch};
