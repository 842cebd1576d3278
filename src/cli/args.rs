//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::CharacterSet;
use crate::ascii::CharSet;
use crate::settings::SettingsPatch;

/// Render 3D models, videos and images through an ASCII glyph mosaic
#[derive(Parser, Debug)]
#[command(name = "aniso-ascii")]
#[command(version, about = "ASCII glyph mosaic renderer for models, videos and images", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render frames to PNG
    Render {
        /// Asset path, URL or data URI (default: [asset] default from config)
        asset: Option<String>,

        /// Output file; numbered when more than one frame is rendered
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Number of frames to render
        #[arg(long, default_value_t = 1)]
        frames: u32,

        /// Tick rate (default: [playback] fps from config)
        #[arg(long)]
        fps: Option<f32>,

        #[command(flatten)]
        effect: EffectArgs,
    },
    /// Print the glyph grid as text
    Text {
        /// Asset path, URL or data URI (default: [asset] default from config)
        asset: Option<String>,

        /// Number of frames to print
        #[arg(long, default_value_t = 1)]
        frames: u32,

        /// Keep printing frames until interrupted
        #[arg(long, short)]
        follow: bool,

        /// Tick rate (default: [playback] fps from config)
        #[arg(long)]
        fps: Option<f32>,

        #[command(flatten)]
        effect: EffectArgs,
    },
    /// Print the asset kind of each reference
    Classify {
        #[arg(required = true)]
        assets: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Effect and viewport overrides. Unset flags keep the config file value.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Glyph alphabet preset
    #[arg(long)]
    pub charset: Option<CharacterSet>,

    /// Custom glyph alphabet, darkest first (overrides --charset)
    #[arg(long)]
    pub characters: Option<String>,

    /// Cell size in viewport pixels
    #[arg(long, short)]
    pub granularity: Option<f32>,

    /// Maximum number of glyphs used
    #[arg(long)]
    pub limit: Option<usize>,

    /// Glyph rasterization size in pixels
    #[arg(long)]
    pub font_size: Option<u32>,

    /// TrueType/OpenType font for the glyphs
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Fill each cell with its color beneath the glyph
    #[arg(long, overrides_with = "no_fill")]
    pub fill: bool,

    /// Draw glyphs over the background (overrides the config file)
    #[arg(long)]
    pub no_fill: bool,

    /// Map bright cells to the first glyphs
    #[arg(long, overrides_with = "no_invert")]
    pub invert: bool,

    /// Map dark cells to the first glyphs (overrides the config file)
    #[arg(long)]
    pub no_invert: bool,

    /// Drop cell colors to grey
    #[arg(long, overrides_with = "no_greyscale")]
    pub greyscale: bool,

    /// Keep cell colors (overrides the config file)
    #[arg(long)]
    pub no_greyscale: bool,

    /// Falling-column matrix animation
    #[arg(long, overrides_with = "no_matrix")]
    pub matrix: bool,

    /// Luminance-mapped glyphs (overrides the config file)
    #[arg(long)]
    pub no_matrix: bool,

    /// Keep the aspect of flat surfaces (overrides the config file)
    #[arg(long, overrides_with = "no_fit")]
    pub fit: bool,

    /// Stretch flat surfaces to the viewport instead of keeping their aspect
    #[arg(long)]
    pub no_fit: bool,

    /// Glyph color as hex, e.g. #ffffff
    #[arg(long)]
    pub color: Option<String>,

    /// Freeze the effect clock at this many seconds
    #[arg(long)]
    pub time: Option<f32>,

    /// Background color as hex
    #[arg(long)]
    pub background: Option<String>,

    /// Viewport width
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height
    #[arg(long)]
    pub height: Option<u32>,

    /// Device pixels per viewport pixel
    #[arg(long)]
    pub pixel_ratio: Option<f32>,
}

impl EffectArgs {
    /// The settings these flags change.
    pub fn patch(&self) -> SettingsPatch {
        // `--x` sets, `--no-x` clears, neither keeps the config value.
        let flag = |on: bool, off: bool| match (on, off) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };
        SettingsPatch {
            characters: self
                .characters
                .clone()
                .or_else(|| self.charset.map(|c| CharSet::from(c).characters())),
            granularity: self.granularity,
            pixel_ratio: self.pixel_ratio,
            character_limit: self.limit,
            font_size: self.font_size,
            fill_pixels: flag(self.fill, self.no_fill),
            invert: flag(self.invert, self.no_invert),
            greyscale: flag(self.greyscale, self.no_greyscale),
            matrix: flag(self.matrix, self.no_matrix),
            fit_to_aspect: flag(self.fit, self.no_fit),
            color: self.color.clone().map(Some),
            time: self.time.map(Some),
            background: self.background.clone(),
        }
    }
}
