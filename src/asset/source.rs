//! Asset references and how their bytes are obtained.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use log::{debug, warn};

use super::classify::AssetKind;
use crate::error::LoadError;

/// Timeout for a whole HTTP download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for establishing an HTTP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry attempts for transient network errors.
pub const DEFAULT_NETWORK_RETRIES: u32 = 3;

/// Base delay for exponential backoff between retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Maximum delay between retries.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(4);

/// Reference to an asset. Replaced wholesale, never edited.
#[derive(Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// A filesystem path, `file://`, `http(s)://` URL or `data:` URI
    Url(String),
    /// In-memory bytes with the file name they arrived under
    Blob { name: String, bytes: Arc<[u8]> },
}

impl AssetRef {
    pub fn url(reference: impl Into<String>) -> Self {
        AssetRef::Url(reference.into())
    }

    pub fn blob(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        AssetRef::Blob {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Short human-readable form for logs and errors. Data URIs are cut
    /// after their MIME header.
    pub fn label(&self) -> String {
        match self {
            AssetRef::Url(url) if is_data_uri(url) => {
                let header = url.split_once(',').map_or(url.as_str(), |(h, _)| h);
                let header: String = header.chars().take(48).collect();
                format!("{header},…")
            }
            AssetRef::Url(url) => url.clone(),
            AssetRef::Blob { name, bytes } => format!("{name} ({} bytes)", bytes.len()),
        }
    }
}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetRef({})", self.label())
    }
}

impl From<&str> for AssetRef {
    fn from(s: &str) -> Self {
        AssetRef::url(s)
    }
}

impl From<String> for AssetRef {
    fn from(s: String) -> Self {
        AssetRef::Url(s)
    }
}

/// Where the decoder finds the asset content.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Fully fetched bytes
    Bytes(Arc<[u8]>),
    /// A local file, used for videos so ffmpeg can stream it
    File(PathBuf),
    /// A remote URL, used for videos so ffmpeg can stream it
    Remote(String),
}

/// Decode the body of a `data:` URI. Only base64 payloads are accepted.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let (header, body) = uri
        .split_once(',')
        .ok_or_else(|| LoadError::malformed(&short(uri), "data URI has no ',' separator"))?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(LoadError::malformed(
            &short(uri),
            "only base64 data URIs are supported",
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(body.trim())
        .map_err(|e| LoadError::malformed(&short(uri), e))
}

fn short(uri: &str) -> String {
    uri.chars().take(48).collect()
}

fn is_data_uri(url: &str) -> bool {
    url.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

fn is_remote(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn local_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

/// Resolves an [`AssetRef`] into a [`Payload`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    http_client: reqwest::Client,
    retries: u32,
}

impl Fetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            retries: DEFAULT_NETWORK_RETRIES,
        })
    }

    /// Produce the decoder input for `asset`.
    ///
    /// Videos stay as paths or URLs when possible; everything else is read
    /// into memory.
    pub async fn fetch(&self, asset: &AssetRef, kind: AssetKind) -> Result<Payload, LoadError> {
        match asset {
            AssetRef::Blob { bytes, .. } => Ok(Payload::Bytes(bytes.clone())),
            AssetRef::Url(url) if is_data_uri(url) => {
                Ok(Payload::Bytes(decode_data_uri(url)?.into()))
            }
            AssetRef::Url(url) if is_remote(url) => match kind {
                AssetKind::Video => Ok(Payload::Remote(url.clone())),
                AssetKind::Model | AssetKind::Image => {
                    Ok(Payload::Bytes(self.download(url).await?.into()))
                }
            },
            AssetRef::Url(url) => {
                let path = local_path(url);
                match kind {
                    AssetKind::Video => {
                        if !path.is_file() {
                            return Err(LoadError::malformed(url, "file not found"));
                        }
                        Ok(Payload::File(path))
                    }
                    AssetKind::Model | AssetKind::Image => {
                        let bytes = tokio::fs::read(&path)
                            .await
                            .map_err(|e| LoadError::malformed(url, e))?;
                        Ok(Payload::Bytes(bytes.into()))
                    }
                }
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let mut attempt = 0;
        loop {
            match self.try_download(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.retries && is_transient_network_error(&e) => {
                    let delay = calculate_backoff(attempt, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX);
                    warn!("Download of {} failed ({}), retrying in {:?}", url, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(LoadError::malformed(url, e)),
            }
        }
    }

    async fn try_download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.http_client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Connection failures, timeouts, body transfer errors and gateway errors
/// are worth retrying.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() || error.is_body() {
        return true;
    }
    matches!(error.status().map(|s| s.as_u16()), Some(502..=504))
}

/// Exponential backoff: `min(base * 2^attempt + base / 2, max)`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt));
    exponential.saturating_add(base / 2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_data_uri() {
        let bytes = decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_reject_plain_data_uri() {
        let err = decode_data_uri("data:image/png,hello").unwrap_err();
        assert!(matches!(err, LoadError::MalformedReference { .. }));
    }

    #[test]
    fn test_reject_bad_base64() {
        let err = decode_data_uri("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, LoadError::MalformedReference { .. }));
        assert!(decode_data_uri("data:image/png;base64").is_err());
    }

    #[test]
    fn test_label_truncates_data_uri() {
        let asset = AssetRef::url(format!("data:image/png;base64,{}", "A".repeat(10_000)));
        let label = asset.label();
        assert!(label.len() < 64);
        assert!(label.starts_with("data:image/png;base64"));
    }

    #[test]
    fn test_remote_detection() {
        assert!(is_remote("https://example.com/a.png"));
        assert!(is_remote("HTTP://example.com/a.png"));
        assert!(!is_remote("/tmp/a.png"));
        assert_eq!(local_path("file:///tmp/a.png"), PathBuf::from("/tmp/a.png"));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(1);
        assert_eq!(calculate_backoff(0, base, max), Duration::from_millis(150));
        assert_eq!(calculate_backoff(1, base, max), Duration::from_millis(250));
        assert_eq!(calculate_backoff(10, base, max), max);
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"pixels").unwrap();

        let fetcher = Fetcher::new().unwrap();
        let asset = AssetRef::url(path.to_string_lossy().to_string());
        match fetcher.fetch(&asset, AssetKind::Image).await.unwrap() {
            Payload::Bytes(bytes) => assert_eq!(&bytes[..], b"pixels"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let fetcher = Fetcher::new().unwrap();
        let asset = AssetRef::url("/definitely/not/here.png");
        let err = fetcher.fetch(&asset, AssetKind::Image).await.unwrap_err();
        assert!(matches!(err, LoadError::MalformedReference { .. }));
    }

    #[tokio::test]
    async fn test_video_file_stays_a_path() {
        let file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        let fetcher = Fetcher::new().unwrap();
        let asset = AssetRef::url(file.path().to_string_lossy().to_string());
        let payload = fetcher.fetch(&asset, AssetKind::Video).await.unwrap();
        assert!(matches!(payload, Payload::File(p) if p == file.path()));
    }

    mod http {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_download_image_bytes() {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/photo.png"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
                .mount(&mock_server)
                .await;

            let fetcher = Fetcher::new().unwrap();
            let asset = AssetRef::url(format!("{}/photo.png", mock_server.uri()));
            match fetcher.fetch(&asset, AssetKind::Image).await.unwrap() {
                Payload::Bytes(bytes) => assert_eq!(&bytes[..], b"png-bytes"),
                other => panic!("unexpected payload {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_not_found_is_not_retried() {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&mock_server)
                .await;

            let fetcher = Fetcher::new().unwrap();
            let asset = AssetRef::url(format!("{}/model.glb", mock_server.uri()));
            let err = fetcher.fetch(&asset, AssetKind::Model).await.unwrap_err();
            assert!(matches!(err, LoadError::MalformedReference { .. }));
        }

        #[tokio::test]
        async fn test_remote_video_is_streamed() {
            let fetcher = Fetcher::new().unwrap();
            let asset = AssetRef::url("https://example.com/clip.mp4");
            let payload = fetcher.fetch(&asset, AssetKind::Video).await.unwrap();
            assert!(matches!(payload, Payload::Remote(_)));
        }
    }
}
