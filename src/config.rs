//! Configuration file handling for aniso-ascii.
//!
//! Loads configuration from `~/.config/aniso-ascii/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scene::Viewport;
use crate::settings::{EffectSettings, SettingsError, SettingsPatch};

/// Configuration file structure for aniso-ascii.
/// Loaded from ~/.config/aniso-ascii/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Effect settings applied over the defaults
    #[serde(default)]
    pub effect: SettingsPatch,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub asset: AssetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl ViewportConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width.max(1), self.height.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Fixed tick rate for rendering
    #[serde(default = "default_fps")]
    pub fps: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Asset shown when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Path to a .ttf/.otf font for the glyph atlas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_fps() -> f32 {
    30.0
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::Parse { path, source: e })
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Effect settings from the defaults, this file and then `overrides`.
    pub fn effect_settings(&self, overrides: &SettingsPatch) -> Result<EffectSettings, SettingsError> {
        let patch = self.effect.clone().overlay(overrides);
        EffectSettings::default().merged(&patch)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("aniso-ascii").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/aniso-ascii/config.toml")
        })
}

/// Contents written by `config init`.
pub const DEFAULT_CONFIG: &str = r##"# aniso-ascii configuration

[effect]
# Glyphs ordered from darkest to brightest
# characters = " *,    ./0!8#X~;$\\}%"
# granularity = 8.0
# pixel_ratio = 1.0
# character_limit = 16
# font_size = 72
# fill_pixels = false
# invert = false
# greyscale = false
# matrix = false
# fit_to_aspect = true
# color = "#ffffff"
# time = 0.0
# background = "#cd9bff"

[viewport]
width = 800
height = 600

[playback]
fps = 30.0

[asset]
# default = "scene.glb"
# font = "/path/to/font.ttf"
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.viewport.viewport(), Viewport::new(800, 600));
    }

    #[test]
    fn test_default_template_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.playback.fps, 30.0);
        assert_eq!(config.effect, SettingsPatch::default());
    }

    #[test]
    fn test_effect_section() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[effect]\ngranularity = 4.0\ninvert = true\nbackground = \"#000000\"\n\n[asset]\ndefault = \"a.png\""
        )
        .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        let settings = config.effect_settings(&SettingsPatch::default()).unwrap();
        assert_eq!(settings.granularity, 4.0);
        assert!(settings.invert);
        assert_eq!(settings.background, Rgb::BLACK);
        assert_eq!(config.asset.default.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::parse("[effect]\ninvert = true\ncharacter_limit = 4").unwrap();
        let overrides = SettingsPatch {
            invert: Some(false),
            ..Default::default()
        };
        let settings = config.effect_settings(&overrides).unwrap();
        assert!(!settings.invert);
        assert_eq!(settings.character_limit, 4);
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[viewport]\nwidth = \"wide\"").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse"));
    }
}
