//! Effect settings: the per-frame configuration record and its channel.
//!
//! Producers (CLI, config file, any UI) never mutate the live record. They
//! build a [`SettingsPatch`], merge it into the current value and publish
//! the result on a [`SettingsChannel`]. The render loop takes one snapshot
//! per tick.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::watch;

use crate::ascii::Alphabet;
use crate::frame::Rgb;

/// Default background of the mosaic (`#cd9bff`).
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0xcd, 0x9b, 0xff);
pub const DEFAULT_GRANULARITY: f32 = 8.0;
pub const DEFAULT_CHARACTER_LIMIT: usize = 16;
pub const DEFAULT_FONT_SIZE: u32 = 72;

/// Errors from parsing settings input.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid color '{0}': expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("Invalid settings patch: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FromStr for Rgb {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SettingsError::InvalidColor(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        match hex.len() {
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Ok(Rgb::new(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The configuration record read by the compositor and the glyph effect.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSettings {
    /// Deduplicated, upper-cased glyph alphabet
    pub alphabet: Alphabet,
    /// Cell side in logical pixels
    pub granularity: f32,
    /// Device pixel ratio applied to `granularity`
    pub pixel_ratio: f32,
    /// Maximum number of glyphs sampled from the alphabet
    pub character_limit: usize,
    /// Glyph rasterization size for the character-set texture
    pub font_size: u32,
    pub fill_pixels: bool,
    pub invert: bool,
    pub greyscale: bool,
    pub matrix: bool,
    pub fit_to_aspect: bool,
    /// Flat stroke color, replacing the sampled hue
    pub override_color: Option<Rgb>,
    /// Fixed effect time in seconds, replacing the elapsed time
    pub override_time: Option<f32>,
    pub background: Rgb,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            granularity: DEFAULT_GRANULARITY,
            pixel_ratio: 1.0,
            character_limit: DEFAULT_CHARACTER_LIMIT,
            font_size: DEFAULT_FONT_SIZE,
            fill_pixels: false,
            invert: false,
            greyscale: false,
            matrix: false,
            fit_to_aspect: true,
            override_color: None,
            override_time: None,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl EffectSettings {
    /// Cell side in device pixels.
    pub fn cell_size(&self) -> u32 {
        crate::ascii::cell_size(self.granularity, self.pixel_ratio)
    }

    /// Return a new record with `patch` applied. `self` is left untouched.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<EffectSettings, SettingsError> {
        let mut next = self.clone();
        if let Some(characters) = &patch.characters {
            next.alphabet = Alphabet::new(characters);
        }
        if let Some(v) = patch.granularity {
            next.granularity = v;
        }
        if let Some(v) = patch.pixel_ratio {
            next.pixel_ratio = v;
        }
        if let Some(v) = patch.character_limit {
            next.character_limit = v;
        }
        if let Some(v) = patch.font_size {
            next.font_size = v;
        }
        if let Some(v) = patch.fill_pixels {
            next.fill_pixels = v;
        }
        if let Some(v) = patch.invert {
            next.invert = v;
        }
        if let Some(v) = patch.greyscale {
            next.greyscale = v;
        }
        if let Some(v) = patch.matrix {
            next.matrix = v;
        }
        if let Some(v) = patch.fit_to_aspect {
            next.fit_to_aspect = v;
        }
        if let Some(color) = &patch.color {
            next.override_color = match color.as_deref().map(str::trim) {
                None | Some("") | Some("none") => None,
                Some(hex) => Some(hex.parse()?),
            };
        }
        if let Some(time) = patch.time {
            next.override_time = time;
        }
        if let Some(background) = &patch.background {
            next.background = background.parse()?;
        }
        Ok(next)
    }
}

/// Absent field: `None`. Explicit `null`: `Some(None)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// A partial settings update. Every field is optional; absent fields keep
/// their current value.
///
/// Keys are snake_case; the camelCase names used by web front-ends are
/// accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<f32>,
    #[serde(alias = "pixelRatio", alias = "dpr", skip_serializing_if = "Option::is_none")]
    pub pixel_ratio: Option<f32>,
    #[serde(
        alias = "characterLimit",
        alias = "charactersLimit",
        skip_serializing_if = "Option::is_none"
    )]
    pub character_limit: Option<usize>,
    #[serde(alias = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(alias = "fillPixels", skip_serializing_if = "Option::is_none")]
    pub fill_pixels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greyscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<bool>,
    #[serde(alias = "fitToAspect", alias = "fit", skip_serializing_if = "Option::is_none")]
    pub fit_to_aspect: Option<bool>,
    /// Override color as hex; `null`, `""` or `"none"` clears it
    #[serde(
        alias = "overrideColor",
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Option<String>>,
    /// Override time in seconds; `null` clears it
    #[serde(
        alias = "overrideTime",
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<Option<f32>>,
    #[serde(alias = "backgroundColor", skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl SettingsPatch {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(mut self, other: &SettingsPatch) -> SettingsPatch {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            characters,
            granularity,
            pixel_ratio,
            character_limit,
            font_size,
            fill_pixels,
            invert,
            greyscale,
            matrix,
            fit_to_aspect,
            color,
            time,
            background
        );
        self
    }
}

/// Single-writer-many-reader channel carrying the current settings.
///
/// Publishing replaces the whole record; readers always observe a complete
/// value.
#[derive(Debug)]
pub struct SettingsChannel {
    tx: watch::Sender<EffectSettings>,
}

impl SettingsChannel {
    pub fn new(initial: EffectSettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current settings.
    pub fn publish(&self, settings: EffectSettings) {
        self.tx.send_replace(settings);
    }

    /// Merge a patch into the current settings and publish the result.
    ///
    /// On error the current settings are left as they were.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<EffectSettings, SettingsError> {
        let next = self.snapshot().merged(patch)?;
        self.publish(next.clone());
        Ok(next)
    }

    /// A copy of the current settings, taken once per frame.
    pub fn snapshot(&self) -> EffectSettings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EffectSettings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsChannel {
    fn default() -> Self {
        Self::new(EffectSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#cd9bff".parse::<Rgb>().unwrap(), DEFAULT_BACKGROUND);
        assert_eq!("fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!("#000000".parse::<Rgb>().unwrap(), Rgb::BLACK);
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gggggg".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_display_hex() {
        assert_eq!(DEFAULT_BACKGROUND.to_string(), "#cd9bff");
    }

    #[test]
    fn test_defaults() {
        let s = EffectSettings::default();
        assert_eq!(s.character_limit, 16);
        assert_eq!(s.cell_size(), 8);
        assert!(s.fit_to_aspect);
        assert!(!s.fill_pixels && !s.invert && !s.greyscale && !s.matrix);
        assert_eq!(s.override_color, None);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = EffectSettings::default();
        let patch = SettingsPatch {
            invert: Some(true),
            ..Default::default()
        };
        let next = base.merged(&patch).unwrap();
        assert!(next.invert);
        assert_eq!(next.granularity, base.granularity);
        assert!(!base.invert);
    }

    #[test]
    fn test_merge_rejects_bad_color_without_change() {
        let channel = SettingsChannel::default();
        let patch = SettingsPatch {
            background: Some("purple".into()),
            ..Default::default()
        };
        assert!(channel.apply(&patch).is_err());
        assert_eq!(channel.snapshot().background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn test_patch_from_camel_case_json() {
        let patch = SettingsPatch::from_json(
            r##"{"characterLimit": 8, "fillPixels": true, "overrideColor": "#ff0000", "fit": false}"##,
        )
        .unwrap();
        let s = EffectSettings::default().merged(&patch).unwrap();
        assert_eq!(s.character_limit, 8);
        assert!(s.fill_pixels);
        assert!(!s.fit_to_aspect);
        assert_eq!(s.override_color, Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_null_clears_override() {
        let base = EffectSettings {
            override_color: Some(Rgb::WHITE),
            override_time: Some(2.0),
            ..Default::default()
        };
        let patch = SettingsPatch::from_json(r#"{"color": null, "time": null}"#).unwrap();
        let next = base.merged(&patch).unwrap();
        assert_eq!(next.override_color, None);
        assert_eq!(next.override_time, None);

        let untouched = base.merged(&SettingsPatch::default()).unwrap();
        assert_eq!(untouched.override_time, Some(2.0));
    }

    #[test]
    fn test_characters_are_normalized() {
        let patch = SettingsPatch {
            characters: Some("aab".into()),
            ..Default::default()
        };
        let s = EffectSettings::default().merged(&patch).unwrap();
        assert_eq!(s.alphabet.as_string(), "AB");
    }

    #[test]
    fn test_overlay_prefers_later_patch() {
        let file = SettingsPatch {
            granularity: Some(4.0),
            invert: Some(true),
            ..Default::default()
        };
        let cli = SettingsPatch {
            granularity: Some(12.0),
            ..Default::default()
        };
        let merged = file.overlay(&cli);
        assert_eq!(merged.granularity, Some(12.0));
        assert_eq!(merged.invert, Some(true));
    }

    #[test]
    fn test_channel_subscribers_see_updates() {
        let channel = SettingsChannel::default();
        let rx = channel.subscribe();
        channel
            .apply(&SettingsPatch {
                matrix: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(rx.borrow().matrix);
    }
}
