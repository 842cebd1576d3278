//! Subcommand handlers.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use super::args::{ConfigAction, EffectArgs};
use crate::ascii::GlyphGrid;
use crate::asset::{classify_str, AssetRef, LoadEvent};
use crate::config::{default_path, Config, DEFAULT_CONFIG};
use crate::renderer::Renderer;
use crate::scene::Viewport;
use crate::settings::{EffectSettings, SettingsChannel};

/// A configured renderer with its asset loaded.
struct Session {
    renderer: Renderer,
    settings: SettingsChannel,
    delta: Duration,
    // Declared last so it is dropped after the renderer.
    runtime: tokio::runtime::Runtime,
}

impl Session {
    fn open(
        config_path: Option<&Path>,
        asset: Option<String>,
        effect: &EffectArgs,
        fps: Option<f32>,
    ) -> Result<Self, String> {
        let config = Config::load(config_path).map_err(|e| e.to_string())?;
        let settings = config
            .effect_settings(&effect.patch())
            .map_err(|e| e.to_string())?;
        let viewport = Viewport::new(
            effect.width.unwrap_or(config.viewport.width).max(1),
            effect.height.unwrap_or(config.viewport.height).max(1),
        );
        let fps = fps.unwrap_or(config.playback.fps);
        if !(fps.is_finite() && fps > 0.0) {
            return Err(format!("Invalid frame rate: {}", fps));
        }

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| format!("Failed to start async runtime: {}", e))?;
        let mut renderer =
            Renderer::new(runtime.handle().clone(), viewport).map_err(|e| e.to_string())?;

        if let Some(font) = effect.font.as_ref().or(config.asset.font.as_ref()) {
            let bytes = std::fs::read(font)
                .map_err(|e| format!("Failed to read font '{}': {}", font.display(), e))?;
            renderer.load_font(&bytes).map_err(|e| e.to_string())?;
        }

        let asset = asset
            .or(config.asset.default)
            .ok_or("No asset given and no [asset] default configured")?;
        renderer.load(AssetRef::url(asset));
        runtime.block_on(renderer.settle(&settings));
        report_events(&mut renderer)?;

        Ok(Self {
            renderer,
            settings: SettingsChannel::new(settings),
            delta: Duration::from_secs_f32(1.0 / fps),
            runtime,
        })
    }

    fn tick(&mut self) -> EffectSettings {
        let _guard = self.runtime.enter();
        let settings = self.settings.snapshot();
        self.renderer.tick(&settings, self.delta);
        settings
    }
}

/// Log load events; the first failure becomes the command's error.
fn report_events(renderer: &mut Renderer) -> Result<(), String> {
    for event in renderer.drain_events() {
        match event {
            LoadEvent::Started { id, kind, reference } => debug!("{} started: {} {}", id, kind, reference),
            LoadEvent::Loaded { id, kind, reference } => info!("{} loaded: {} {}", id, kind, reference),
            LoadEvent::Failed { error, .. } => return Err(error.to_string()),
        }
    }
    Ok(())
}

/// `frame.png` for a single frame, `frame_0001.png`.. otherwise.
pub fn frame_path(output: &Path, index: u32, frames: u32) -> PathBuf {
    if frames <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    output.with_file_name(format!("{}_{:04}.{}", stem, index + 1, ext))
}

/// Render `frames` ticks and write each canvas to a PNG.
pub fn render(
    config_path: Option<&Path>,
    asset: Option<String>,
    output: &Path,
    frames: u32,
    fps: Option<f32>,
    effect: &EffectArgs,
) -> Result<(), String> {
    let mut session = Session::open(config_path, asset, effect, fps)?;
    let canvas = session.renderer.canvas();
    for index in 0..frames.max(1) {
        session.tick();
        let path = frame_path(output, index, frames);
        canvas
            .save_png(&path)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Print the glyph grid of each tick.
pub fn text(
    config_path: Option<&Path>,
    asset: Option<String>,
    frames: u32,
    follow: bool,
    fps: Option<f32>,
    effect: &EffectArgs,
) -> Result<(), String> {
    let mut session = Session::open(config_path, asset, effect, fps)?;

    let running = Arc::new(AtomicBool::new(true));
    if follow {
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .map_err(|e| format!("Error setting Ctrl-C handler: {}", e))?;
    }

    let stdout = std::io::stdout();
    let mut printed = 0u32;
    while running.load(Ordering::SeqCst) && (follow || printed < frames.max(1)) {
        let settings = session.tick();
        let grid = printable_grid(&session.renderer, &settings)?;
        write_frame(&mut stdout.lock(), grid, follow)
            .map_err(|e| format!("Failed to write frame: {}", e))?;
        printed += 1;
        if follow {
            std::thread::sleep(session.delta);
            report_events(&mut session.renderer)?;
        }
    }
    Ok(())
}

/// The grid of the last tick, or why there is none.
fn printable_grid<'a>(renderer: &'a Renderer, settings: &EffectSettings) -> Result<&'a GlyphGrid, String> {
    match renderer.last_grid() {
        Some(grid) => Ok(grid),
        None if settings.alphabet.is_empty() => {
            Err("The glyph alphabet is empty; there is nothing to print".to_string())
        }
        None => Err("Glyph atlas is not ready".to_string()),
    }
}

/// Write one grid as text lines, each ending in a newline.
pub fn write_frame(out: &mut impl Write, grid: &GlyphGrid, follow: bool) -> io::Result<()> {
    if follow {
        // Home the cursor and clear the screen between frames.
        write!(out, "\x1b[H\x1b[2J")?;
    }
    writeln!(out, "{}", grid.to_text())?;
    out.flush()
}

/// Print the kind of every reference, `unknown` when none matches.
pub fn classify(assets: &[String]) {
    for asset in assets {
        let kind = classify_str(asset).map_or("unknown", |k| k.name());
        println!("{}\t{}", kind, asset);
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) -> Result<(), String> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&path)).map_err(|e| e.to_string())?;
            let body = toml::to_string_pretty(&config)
                .map_err(|e| format!("Failed to format configuration: {}", e))?;
            println!("Current configuration:");
            println!();
            println!("{}", body);
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'aniso-ascii config show' to view current settings.",
                    path.display()
                ));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }
            std::fs::write(&path, DEFAULT_CONFIG)
                .map_err(|e| format!("Error writing config file: {}", e))?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::GlyphCell;

    #[test]
    fn test_frame_path_numbering() {
        let out = Path::new("/tmp/out/shot.png");
        assert_eq!(frame_path(out, 0, 1), PathBuf::from("/tmp/out/shot.png"));
        assert_eq!(frame_path(out, 0, 3), PathBuf::from("/tmp/out/shot_0001.png"));
        assert_eq!(frame_path(out, 2, 3), PathBuf::from("/tmp/out/shot_0003.png"));
    }

    fn grid(rows: &[&str]) -> GlyphGrid {
        let cells: Vec<GlyphCell> = rows
            .iter()
            .flat_map(|r| r.chars())
            .map(|glyph| GlyphCell {
                index: 0,
                glyph,
                color: crate::frame::Rgb::WHITE,
            })
            .collect();
        GlyphGrid {
            cols: rows[0].chars().count() as u32,
            rows: rows.len() as u32,
            cells,
        }
    }

    #[test]
    fn test_frames_are_separate_lines() {
        let mut out = Vec::new();
        write_frame(&mut out, &grid(&["AB", "CD"]), false).unwrap();
        write_frame(&mut out, &grid(&["EF", "GH"]), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "AB\nCD\nEF\nGH\n");
    }

    #[test]
    fn test_follow_clears_before_each_frame() {
        let mut out = Vec::new();
        write_frame(&mut out, &grid(&["#"]), true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[H\x1b[2J#\n");
    }

    #[tokio::test]
    async fn test_empty_alphabet_is_reported_as_such() {
        let mut renderer = Renderer::new(tokio::runtime::Handle::current(), Viewport::new(8, 8)).unwrap();
        let empty = EffectSettings::default()
            .merged(&crate::settings::SettingsPatch {
                characters: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        renderer.tick(&empty, Duration::ZERO);
        let err = printable_grid(&renderer, &empty).unwrap_err();
        assert!(err.contains("alphabet is empty"), "{}", err);
    }

    #[test]
    fn test_config_init_then_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        handle_config_action(ConfigAction::Init, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
        assert!(handle_config_action(ConfigAction::Init, Some(&path)).is_err());
        handle_config_action(ConfigAction::Show, Some(&path)).unwrap();
    }
}
