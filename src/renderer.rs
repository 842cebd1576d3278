//! The per-tick render loop.
//!
//! A [`Renderer`] owns the resident surface and every stage that turns it
//! into a glyph mosaic. Each [`Renderer::tick`] runs, in order:
//!
//! 1. Apply finished loads and atlas builds
//! 2. Advance animation clips
//! 3. Update the camera policy and place the surface
//! 4. Rasterize
//! 5. Run the glyph mosaic and publish the result to the canvas

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use tokio::runtime::Handle;

use crate::animation::AnimationDriver;
use crate::ascii::{AtlasBuilder, AtlasError, GlyphFrame, GlyphGrid, GlyphMosaicEffect};
use crate::asset::{
    classify, AssetKind, AssetLoader, AssetRef, Decode, LoadEvent, LoadOutcome, LoadedSurface, RequestId,
};
use crate::error::LoadError;
use crate::frame::Frame;
use crate::scene::{surface_scale, CameraState, FrameCompositor, Raster, Viewport};
use crate::settings::EffectSettings;

/// How long [`Renderer::settle`] waits for the first video frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only view of the most recently published output frame.
#[derive(Debug, Clone)]
pub struct CanvasHandle {
    frame: Arc<Mutex<Frame>>,
}

impl CanvasHandle {
    fn new() -> Self {
        Self {
            frame: Arc::new(Mutex::new(Frame::new(0, 0))),
        }
    }

    fn publish(&self, frame: Frame) {
        match self.frame.lock() {
            Ok(mut slot) => *slot = frame,
            Err(poisoned) => *poisoned.into_inner() = frame,
        }
    }

    /// Copy of the current canvas contents.
    pub fn snapshot(&self) -> Frame {
        match self.frame.lock() {
            Ok(frame) => frame.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.snapshot().save_png(path)
    }
}

pub struct Renderer {
    loader: AssetLoader,
    atlas: AtlasBuilder,
    surface: Option<LoadedSurface>,
    driver: AnimationDriver,
    compositor: FrameCompositor,
    raster: Raster,
    effect: GlyphMosaicEffect,
    viewport: Viewport,
    canvas: CanvasHandle,
    last: Option<GlyphFrame>,
    elapsed: Duration,
    events: Vec<LoadEvent>,
}

impl Renderer {
    pub fn new(handle: Handle, viewport: Viewport) -> Result<Self, LoadError> {
        let loader = AssetLoader::new(handle.clone())?;
        Ok(Self::with_loader(handle, viewport, loader))
    }

    /// Renderer whose loads go through a custom decoder.
    pub fn with_decoder(handle: Handle, viewport: Viewport, decoder: Arc<dyn Decode>) -> Result<Self, LoadError> {
        let loader = AssetLoader::with_decoder(handle.clone(), decoder)?;
        Ok(Self::with_loader(handle, viewport, loader))
    }

    fn with_loader(handle: Handle, viewport: Viewport, loader: AssetLoader) -> Self {
        Self {
            loader,
            atlas: AtlasBuilder::new(handle),
            surface: None,
            driver: AnimationDriver::new(),
            compositor: FrameCompositor::new(),
            raster: Raster::new(viewport.width, viewport.height),
            effect: GlyphMosaicEffect::new(),
            viewport,
            canvas: CanvasHandle::new(),
            last: None,
            elapsed: Duration::ZERO,
            events: Vec::new(),
        }
    }

    /// Request a new asset. The current surface stays visible until the
    /// load completes. Rejected references are reported as a
    /// [`LoadEvent::Failed`] and return `None`.
    pub fn load(&mut self, asset: AssetRef) -> Option<RequestId> {
        let reference = asset.label();
        let kind = classify(&asset);
        match self.loader.request(asset) {
            Ok(id) => {
                if let Some(kind) = kind {
                    self.events.push(LoadEvent::Started { id, kind, reference });
                }
                Some(id)
            }
            Err(error) => {
                warn!("{}", error);
                self.events.push(LoadEvent::Failed {
                    id: None,
                    reference,
                    error,
                });
                None
            }
        }
    }

    /// Use a custom font for the glyph atlas. Takes effect on the next tick.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<(), AtlasError> {
        self.atlas.set_font(bytes)
    }

    /// Take every event recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<LoadEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn canvas(&self) -> CanvasHandle {
        self.canvas.clone()
    }

    pub fn camera(&self) -> &CameraState {
        self.compositor.camera()
    }

    pub fn compositor(&self) -> &FrameCompositor {
        &self.compositor
    }

    pub fn surface(&self) -> Option<&LoadedSurface> {
        self.surface.as_ref()
    }

    pub fn surface_kind(&self) -> Option<AssetKind> {
        self.surface.as_ref().map(LoadedSurface::kind)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Output of the last tick.
    pub fn last_frame(&self) -> Option<&GlyphFrame> {
        self.last.as_ref()
    }

    pub fn last_grid(&self) -> Option<&GlyphGrid> {
        self.last.as_ref().and_then(|f| f.grid.as_ref())
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Ready {
                id,
                reference,
                surface,
            } => {
                let kind = surface.kind();
                match surface.as_model() {
                    Some(model) => self.driver.bind(model),
                    None => self.driver.clear(),
                }
                info!("Showing {} {} ({})", kind, reference, id);
                // Replacing the surface drops the previous one.
                self.surface = Some(surface);
                self.events.push(LoadEvent::Loaded { id, kind, reference });
            }
            LoadOutcome::Failed {
                id,
                reference,
                error,
            } => {
                self.events.push(LoadEvent::Failed {
                    id: Some(id),
                    reference,
                    error,
                });
            }
        }
    }

    /// Wait for the pending load and atlas build to finish, and for a
    /// video surface's first frame.
    pub async fn settle(&mut self, settings: &EffectSettings) {
        if let Some(outcome) = self.loader.next_outcome().await {
            self.apply_outcome(outcome);
        }
        self.atlas.ensure(&settings.alphabet, settings.font_size);
        self.atlas.ready().await;

        if let Some(LoadedSurface::Video(video)) = &self.surface {
            let deadline = tokio::time::Instant::now() + FIRST_FRAME_TIMEOUT;
            while video.frames_decoded() == 0 && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            if video.frames_decoded() == 0 {
                warn!("No video frame arrived within {:?}", FIRST_FRAME_TIMEOUT);
            }
        }
    }

    /// Render one frame with `settings`, `delta` after the previous tick.
    pub fn tick(&mut self, settings: &EffectSettings, delta: Duration) {
        if let Some(outcome) = self.loader.poll() {
            self.apply_outcome(outcome);
        }
        self.atlas.ensure(&settings.alphabet, settings.font_size);
        self.atlas.poll();

        self.driver.advance(delta);
        self.elapsed += delta;

        self.compositor.update(self.surface_kind());

        let (width, height) = self.viewport.device_size(settings.pixel_ratio);
        self.raster.resize(width, height);
        self.raster.clear();

        let camera = *self.compositor.camera();
        let viewport = self.viewport;
        let raster = &mut self.raster;
        match &self.surface {
            Some(LoadedSurface::Model(model)) => {
                let pose = self.driver.pose(model);
                raster.draw_model(model, &pose, &camera, viewport);
            }
            Some(LoadedSurface::Video(video)) => {
                let scale = surface_scale(Some((video.width(), video.height())), viewport, settings.fit_to_aspect);
                video.with_latest(|frame| raster.draw_quad(frame, scale, &camera, viewport));
            }
            Some(LoadedSurface::Image(image)) => {
                let scale = surface_scale(Some((image.width(), image.height())), viewport, settings.fit_to_aspect);
                raster.draw_quad(image.bitmap(), scale, &camera, viewport);
            }
            None => {}
        }

        let output = self.effect.apply(
            self.raster.frame(),
            self.atlas.current(),
            settings,
            self.elapsed.as_secs_f32(),
        );
        self.canvas.publish(output.frame.clone());
        self.last = Some(output);
    }
}
