//! Asynchronous asset loading with last-request-wins semantics.
//!
//! Each [`AssetLoader::request`] issues a new [`RequestId`]. Fetch and
//! decode run on the tokio runtime; completions come back over a channel
//! and are matched against the latest issued id. Anything older is dropped.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::bitmap::ImageSurface;
use super::classify::{classify, AssetKind};
use super::model::ModelSurface;
use super::source::{AssetRef, Fetcher, Payload};
use super::surface::LoadedSurface;
use super::video::VideoSurface;
use crate::error::LoadError;

/// Identity of one load request. Ids increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Turns a fetched payload into a surface. Runs on the blocking pool.
pub trait Decode: Send + Sync + 'static {
    fn decode(&self, kind: AssetKind, payload: Payload, label: &str) -> Result<LoadedSurface, LoadError>;
}

/// Decoder for the supported formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatDecoder;

impl Decode for FormatDecoder {
    fn decode(&self, kind: AssetKind, payload: Payload, label: &str) -> Result<LoadedSurface, LoadError> {
        match (kind, payload) {
            (AssetKind::Video, payload) => VideoSurface::open(payload)
                .map(LoadedSurface::Video)
                .map_err(|e| LoadError::decode("video", label, e)),
            (AssetKind::Model, Payload::Bytes(bytes)) => {
                ModelSurface::decode(&bytes, label).map(LoadedSurface::Model)
            }
            (AssetKind::Image, Payload::Bytes(bytes)) => {
                ImageSurface::decode(&bytes, label).map(LoadedSurface::Image)
            }
            (kind, _) => Err(LoadError::decode(
                kind.name(),
                label,
                "asset content was not fetched into memory",
            )),
        }
    }
}

/// Progress notifications, drained by the render loop owner.
#[derive(Debug)]
pub enum LoadEvent {
    Started {
        id: RequestId,
        kind: AssetKind,
        reference: String,
    },
    Loaded {
        id: RequestId,
        kind: AssetKind,
        reference: String,
    },
    /// `id` is `None` when the request was rejected before being issued
    Failed {
        id: Option<RequestId>,
        reference: String,
        error: LoadError,
    },
}

/// Result of the latest request.
#[derive(Debug)]
pub enum LoadOutcome {
    Ready {
        id: RequestId,
        reference: String,
        surface: LoadedSurface,
    },
    Failed {
        id: RequestId,
        reference: String,
        error: LoadError,
    },
}

struct Completion {
    id: RequestId,
    reference: String,
    result: Result<LoadedSurface, LoadError>,
}

pub struct AssetLoader {
    handle: Handle,
    fetcher: Fetcher,
    decoder: Arc<dyn Decode>,
    next_id: u64,
    latest: Option<RequestId>,
    pending: bool,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl AssetLoader {
    /// Loader for the supported formats.
    pub fn new(handle: Handle) -> Result<Self, LoadError> {
        Self::with_decoder(handle, Arc::new(FormatDecoder))
    }

    pub fn with_decoder(handle: Handle, decoder: Arc<dyn Decode>) -> Result<Self, LoadError> {
        let fetcher =
            Fetcher::new().map_err(|e| LoadError::malformed("http client", e))?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            handle,
            fetcher,
            decoder,
            next_id: 0,
            latest: None,
            pending: false,
            tx,
            rx,
        })
    }

    /// The most recently issued request.
    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// True while the latest request has not completed.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start loading `asset`, superseding any request still in flight.
    ///
    /// Unclassifiable assets are rejected immediately with
    /// [`LoadError::ClassificationMiss`]; no request is issued and the
    /// in-flight request (if any) stays the latest.
    pub fn request(&mut self, asset: AssetRef) -> Result<RequestId, LoadError> {
        let reference = asset.label();
        let kind = classify(&asset).ok_or_else(|| LoadError::ClassificationMiss {
            reference: reference.clone(),
        })?;

        self.next_id += 1;
        let id = RequestId(self.next_id);
        if let Some(previous) = self.latest.filter(|_| self.pending) {
            debug!("Request {} supersedes {}", id, previous);
        }
        self.latest = Some(id);
        self.pending = true;
        info!("Loading {} {} ({})", kind, reference, id);

        let fetcher = self.fetcher.clone();
        let decoder = self.decoder.clone();
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = match fetcher.fetch(&asset, kind).await {
                Ok(payload) => {
                    let label = reference.clone();
                    tokio::task::spawn_blocking(move || decoder.decode(kind, payload, &label))
                        .await
                        .unwrap_or(Err(LoadError::TaskAborted(id)))
                }
                Err(e) => Err(e),
            };
            let _ = tx.send(Completion {
                id,
                reference,
                result,
            });
        });

        Ok(id)
    }

    fn accept(&mut self, completion: Completion) -> Option<LoadOutcome> {
        if Some(completion.id) != self.latest {
            debug!("{}", LoadError::StaleLoadDiscarded(completion.id));
            return None;
        }
        self.pending = false;
        let Completion {
            id,
            reference,
            result,
        } = completion;
        Some(match result {
            Ok(surface) => LoadOutcome::Ready {
                id,
                reference,
                surface,
            },
            Err(error) => {
                warn!("Failed to load {}: {}", reference, error);
                LoadOutcome::Failed {
                    id,
                    reference,
                    error,
                }
            }
        })
    }

    /// Collect finished loads without blocking. Returns the outcome of the
    /// latest request once it has completed.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut outcome = None;
        while let Ok(completion) = self.rx.try_recv() {
            if let Some(o) = self.accept(completion) {
                outcome = Some(o);
            }
        }
        outcome
    }

    /// Wait for the latest request to complete. Returns `None` when no
    /// request is pending.
    pub async fn next_outcome(&mut self) -> Option<LoadOutcome> {
        while self.pending {
            let completion = self.rx.recv().await?;
            if let Some(outcome) = self.accept(completion) {
                return Some(outcome);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use std::time::Duration;

    /// Decodes blobs into blank images; blobs named `slow.*` take a while.
    struct SleepyDecoder;

    impl Decode for SleepyDecoder {
        fn decode(&self, _kind: AssetKind, payload: Payload, label: &str) -> Result<LoadedSurface, LoadError> {
            if label.starts_with("slow") {
                std::thread::sleep(Duration::from_millis(150));
            }
            let Payload::Bytes(bytes) = payload else {
                return Err(LoadError::decode("image", label, "expected bytes"));
            };
            Ok(LoadedSurface::Image(ImageSurface::from_frame(Frame::new(bytes.len() as u32, 1))))
        }
    }

    fn loader() -> AssetLoader {
        AssetLoader::with_decoder(Handle::current(), Arc::new(SleepyDecoder)).unwrap()
    }

    #[tokio::test]
    async fn test_classification_miss_issues_nothing() {
        let mut loader = loader();
        let err = loader.request(AssetRef::url("notes.txt")).unwrap_err();
        assert!(matches!(err, LoadError::ClassificationMiss { .. }));
        assert_eq!(loader.latest(), None);
        assert!(!loader.is_pending());
        assert!(loader.next_outcome().await.is_none());
    }

    #[tokio::test]
    async fn test_latest_request_wins() {
        let mut loader = loader();
        let slow = loader.request(AssetRef::blob("slow.png", vec![0u8; 7])).unwrap();
        let fast = loader.request(AssetRef::blob("fast.png", vec![0u8; 3])).unwrap();
        assert!(fast > slow);

        match loader.next_outcome().await {
            Some(LoadOutcome::Ready { id, surface, .. }) => {
                assert_eq!(id, fast);
                assert_eq!(surface.intrinsic_size(), Some((3, 1)));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(loader.poll().is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported() {
        let mut loader = AssetLoader::new(Handle::current()).unwrap();
        let id = loader
            .request(AssetRef::blob("broken.png", b"not a png".to_vec()))
            .unwrap();
        match loader.next_outcome().await {
            Some(LoadOutcome::Failed { id: got, error, .. }) => {
                assert_eq!(got, id);
                assert!(matches!(error, LoadError::DecodeFailure { .. }));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!loader.is_pending());
    }
}
