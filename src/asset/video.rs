//! Video streaming through an `ffmpeg` child process.
//!
//! `ffprobe` reports the intrinsic size first. `ffmpeg` then decodes the
//! source in real time, silently and looping forever, writing raw RGBA
//! frames to stdout. A reader thread keeps only the most recent frame.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::source::Payload;
use crate::frame::Frame;

/// Errors from the ffmpeg/ffprobe plumbing.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("{0} not found. Please install FFmpeg")]
    ToolNotFound(&'static str),

    #[error("Failed to spawn {tool}: {source}")]
    SpawnFailed {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn spawn_error(tool: &'static str, e: std::io::Error) -> VideoError {
    if e.kind() == std::io::ErrorKind::NotFound {
        VideoError::ToolNotFound(tool)
    } else {
        VideoError::SpawnFailed { tool, source: e }
    }
}

/// Stream properties reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, 0 when unknown
    pub fps: f64,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
}

/// Parse an ffprobe rational like `30000/1001`.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Interpret ffprobe JSON output.
pub fn parse_probe(json: &[u8]) -> Result<VideoInfo, VideoError> {
    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| VideoError::ProbeFailed(e.to_string()))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(VideoError::NoVideoStream)?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(VideoError::ProbeFailed("missing video dimensions".into())),
    };
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .unwrap_or(0.0);
    Ok(VideoInfo { width, height, fps })
}

/// Run `ffprobe` on a file path or URL.
pub fn probe(input: &OsString) -> Result<VideoInfo, VideoError> {
    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(input)
        .output()
        .map_err(|e| spawn_error("ffprobe", e))?;
    if !out.status.success() {
        return Err(VideoError::ProbeFailed(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    parse_probe(&out.stdout)
}

/// Arguments for a silent, looping, real-time RGBA decode to stdout.
fn decode_args(input: &OsString) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-stream_loop", "-1", "-re", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(input.clone());
    args.extend(
        ["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]
            .iter()
            .map(OsString::from),
    );
    args
}

/// A live video source. Dropping it stops the decoder.
pub struct VideoSurface {
    info: VideoInfo,
    latest: Arc<Mutex<Option<Frame>>>,
    frames_decoded: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    child: Child,
    reader_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
    /// Backing file for in-memory sources; deleted on drop
    _spill: Option<NamedTempFile>,
}

impl VideoSurface {
    /// Probe and start streaming `payload`.
    ///
    /// In-memory bytes are spilled to a temporary file first since ffmpeg
    /// needs a seekable input to loop.
    pub fn open(payload: Payload) -> Result<Self, VideoError> {
        let (input, spill) = match payload {
            Payload::File(path) => (path.into_os_string(), None),
            Payload::Remote(url) => (OsString::from(url), None),
            Payload::Bytes(bytes) => {
                let mut file = tempfile::Builder::new().prefix("aniso-video-").tempfile()?;
                std::io::Write::write_all(&mut file, &bytes)?;
                (file.path().as_os_str().to_owned(), Some(file))
            }
        };

        let info = probe(&input)?;
        info!(
            "Streaming video {}x{} @ {:.2} fps",
            info.width, info.height, info.fps
        );

        let mut child = Command::new("ffmpeg")
            .args(decode_args(&input))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let latest = Arc::new(Mutex::new(None));
        let frames_decoded = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines() {
                    match line {
                        Ok(l) => warn!("[ffmpeg] {}", l),
                        Err(_) => break,
                    }
                }
            })
        });

        let reader_thread = child.stdout.take().map(|stdout| {
            let latest = latest.clone();
            let frames_decoded = frames_decoded.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                run_reader(stdout, info, latest, frames_decoded, stop);
            })
        });

        Ok(Self {
            info,
            latest,
            frames_decoded,
            stop,
            child,
            reader_thread,
            stderr_thread,
            _spill: spill,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Number of frames received so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded.load(Ordering::Relaxed)
    }

    /// Run `f` on the most recent frame, if one has arrived.
    pub fn with_latest<R>(&self, f: impl FnOnce(&Frame) -> R) -> Option<R> {
        let guard = self.latest.lock().ok()?;
        guard.as_ref().map(f)
    }
}

impl std::fmt::Debug for VideoSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSurface")
            .field("info", &self.info)
            .field("frames_decoded", &self.frames_decoded())
            .finish()
    }
}

impl Drop for VideoSurface {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
        debug!("Video decoder stopped after {} frames", self.frames_decoded());
    }
}

fn run_reader(
    mut stdout: impl Read,
    info: VideoInfo,
    latest: Arc<Mutex<Option<Frame>>>,
    frames_decoded: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
) {
    let frame_len = info.width as usize * info.height as usize * Frame::BYTES_PER_PIXEL;
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let mut data = vec![0u8; frame_len];
        if stdout.read_exact(&mut data).is_err() {
            break;
        }
        if let Some(frame) = Frame::from_rgba(info.width, info.height, data) {
            if let Ok(mut slot) = latest.lock() {
                *slot = Some(frame);
            }
            frames_decoded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_picks_video_stream() {
        let json = br#"{"streams":[
            {"codec_type":"audio"},
            {"codec_type":"video","width":1920,"height":1080,"r_frame_rate":"30000/1001"}
        ]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_without_video() {
        let json = br#"{"streams":[{"codec_type":"audio"}]}"#;
        assert!(matches!(parse_probe(json), Err(VideoError::NoVideoStream)));
        assert!(matches!(parse_probe(b"nope"), Err(VideoError::ProbeFailed(_))));
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_decode_args_are_silent_and_looping() {
        let args = decode_args(&OsString::from("clip.mp4"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_pos + 1], "-1");
        assert!(loop_pos < args.iter().position(|a| a == "-i").unwrap());
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_reader_keeps_latest_frame() {
        let info = VideoInfo {
            width: 1,
            height: 1,
            fps: 0.0,
        };
        let bytes: Vec<u8> = vec![1, 1, 1, 255, 9, 9, 9, 255, 7];
        let latest = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicU64::new(0));
        run_reader(
            std::io::Cursor::new(bytes),
            info,
            latest.clone(),
            count.clone(),
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(count.load(Ordering::Relaxed), 2);
        let frame = latest.lock().unwrap().clone().unwrap();
        assert_eq!(frame.data, vec![9, 9, 9, 255]);
    }

    #[test]
    #[ignore] // requires ffmpeg
    fn test_stream_generated_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-f", "lavfi", "-i", "testsrc=size=64x48:rate=10", "-t", "1"])
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());

        let surface = VideoSurface::open(Payload::File(path)).unwrap();
        assert_eq!((surface.width(), surface.height()), (64, 48));
        std::thread::sleep(std::time::Duration::from_millis(500));
        assert!(surface.with_latest(|f| f.width).is_some());
    }
}
