use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::capture::decoder::{CameraFacing, Decoder, FrameConfig};
use crate::capture::types::ScanEvent;
use crate::error::CaptureError;

const SCAN_CHANNEL_CAPACITY: usize = 8;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw video input seam. Opening errors mean the camera is unavailable for
/// the whole session.
pub trait FrameSource: Send + 'static {
    fn open(&mut self, facing: CameraFacing, frame: FrameConfig) -> Result<(), CaptureError>;

    /// One frame, or `None` when no new frame is available yet.
    fn next_frame(&mut self) -> Result<Option<DynamicImage>, CaptureError>;

    fn close(&mut self);
}

/// Frame source backed by a snapshot file that external camera glue keeps
/// overwriting. A frame is reported only when the file's mtime moves.
pub struct StillFrameSource {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl StillFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }
}

impl FrameSource for StillFrameSource {
    fn open(&mut self, facing: CameraFacing, _frame: FrameConfig) -> Result<(), CaptureError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => std::path::Path::new("."),
        };
        if !parent.is_dir() {
            return Err(CaptureError::CameraUnavailable(format!(
                "no camera glue at {}",
                parent.display()
            )));
        }
        debug!(path = %self.path.display(), facing = ?facing, "snapshot source opened");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<DynamicImage>, CaptureError> {
        let modified = match std::fs::metadata(&self.path) {
            Ok(meta) => meta
                .modified()
                .map_err(|e| CaptureError::Decoder(e.to_string()))?,
            // The glue has not written a snapshot yet.
            Err(_) => return Ok(None),
        };
        if self.last_seen == Some(modified) {
            return Ok(None);
        }
        self.last_seen = Some(modified);
        match image::open(&self.path) {
            Ok(frame) => Ok(Some(frame)),
            // Torn write while the glue was replacing the file; skip it.
            Err(e) => {
                debug!(error = %e, "unreadable snapshot skipped");
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.last_seen = None;
    }
}

/// Runs QR recognition over a frame. A frame with no decodable code is not
/// an error, it is just noise.
pub(crate) fn decode_frame(frame: &DynamicImage) -> Option<String> {
    let luma = frame.to_luma8();
    let (width, height) = luma.dimensions();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            luma.get_pixel(x as u32, y as u32).0[0]
        });
    prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
        Ok((_, content)) => Some(content),
        Err(e) => {
            debug!(error = %e, "grid decode noise");
            None
        }
    })
}

/// Camera decoder that pulls frames from a [`FrameSource`] on a worker
/// thread and emits one [`ScanEvent`] per recognized code.
///
/// Consecutive identical payloads are collapsed until the next pause/resume
/// boundary, so a code held steadily to the camera yields a single event per
/// cycle.
pub struct QrDecoder<S: FrameSource> {
    source: Option<S>,
    poll_interval: Duration,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl<S: FrameSource> QrDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            poll_interval: DEFAULT_POLL_INTERVAL,
            paused: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            worker: None,
        }
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait]
impl<S: FrameSource> Decoder for QrDecoder<S> {
    async fn start(
        &mut self,
        facing: CameraFacing,
        frame: FrameConfig,
    ) -> Result<mpsc::Receiver<ScanEvent>, CaptureError> {
        let mut source = self.source.take().ok_or(CaptureError::AlreadyStarted)?;
        if let Err(e) = source.open(facing, frame) {
            // Leave the source in place so an explicit retry can reopen it.
            self.source = Some(source);
            return Err(e);
        }

        let (scan_tx, scan_rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
        self.cancel = CancellationToken::new();
        self.paused.store(false, Ordering::Release);

        let paused = self.paused.clone();
        let cancel = self.cancel.clone();
        let idle = self.poll_interval;
        self.worker = Some(std::thread::spawn(move || {
            worker_loop(source, scan_tx, paused, cancel, idle, decode_frame)
        }));
        Ok(scan_rx)
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("decoder worker did not shut down cleanly");
            }
        }
    }
}

fn worker_loop<S, F>(
    mut source: S,
    scan_tx: mpsc::Sender<ScanEvent>,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
    idle: Duration,
    mut decode: F,
) where
    S: FrameSource,
    F: FnMut(&DynamicImage) -> Option<String>,
{
    let mut last_payload: Option<String> = None;
    let mut was_paused = false;
    while !cancel.is_cancelled() {
        if paused.load(Ordering::Acquire) {
            was_paused = true;
            std::thread::sleep(idle);
            continue;
        }
        if was_paused {
            // A pause/resume boundary re-arms duplicate suppression.
            last_payload = None;
            was_paused = false;
        }
        match source.next_frame() {
            Ok(Some(frame)) => match decode(&frame) {
                Some(text) if last_payload.as_deref() != Some(text.as_str()) => {
                    last_payload = Some(text.clone());
                    if scan_tx.blocking_send(ScanEvent::new(text)).is_err() {
                        break;
                    }
                }
                Some(_) => debug!("duplicate payload suppressed"),
                None => {}
            },
            Ok(None) => std::thread::sleep(idle),
            Err(e) => {
                warn!(error = %e, "frame source error");
                std::thread::sleep(idle);
            }
        }
    }
    source.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn blank_frame() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            64,
            64,
            Rgb([255, 255, 255]),
        ))
    }

    struct ScriptedSource {
        frames: Arc<Mutex<VecDeque<DynamicImage>>>,
        fail_open: bool,
        closed: Arc<AtomicBool>,
    }

    impl FrameSource for ScriptedSource {
        fn open(&mut self, _facing: CameraFacing, _frame: FrameConfig) -> Result<(), CaptureError> {
            if self.fail_open {
                return Err(CaptureError::CameraUnavailable("permission denied".into()));
            }
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<DynamicImage>, CaptureError> {
            Ok(self.frames.lock().unwrap().pop_front())
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn blank_frame_is_decode_noise() {
        assert_eq!(decode_frame(&blank_frame()), None);
    }

    #[test]
    fn worker_collapses_consecutive_duplicates_until_resume() {
        let frames = Arc::new(Mutex::new(VecDeque::from(vec![
            blank_frame(),
            blank_frame(),
            blank_frame(),
            blank_frame(),
        ])));
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource {
            frames: frames.clone(),
            fail_open: false,
            closed: closed.clone(),
        };
        let (scan_tx, mut scan_rx) = mpsc::channel(8);
        let paused = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        // Scripted recognizer: the same payload for every frame, which must
        // come through once, then once more after a pause/resume cycle.
        let paused_for_worker = paused.clone();
        let cancel_for_worker = cancel.clone();
        let worker = std::thread::spawn(move || {
            worker_loop(
                source,
                scan_tx,
                paused_for_worker,
                cancel_for_worker,
                Duration::from_millis(1),
                |_| Some("student-token".to_string()),
            )
        });

        let first = scan_rx.blocking_recv().expect("first scan");
        assert_eq!(first.raw_text, "student-token");

        paused.store(true, Ordering::Release);
        std::thread::sleep(Duration::from_millis(10));
        frames.lock().unwrap().push_back(blank_frame());
        paused.store(false, Ordering::Release);

        let second = scan_rx.blocking_recv().expect("second scan after resume");
        assert_eq!(second.raw_text, "student-token");

        cancel.cancel();
        worker.join().unwrap();
        assert!(closed.load(Ordering::SeqCst));
        // Nothing queued beyond the two cycle boundaries.
        assert!(scan_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_failure_is_camera_unavailable_and_retryable() {
        let mut decoder = QrDecoder::new(ScriptedSource {
            frames: Arc::new(Mutex::new(VecDeque::new())),
            fail_open: true,
            closed: Arc::new(AtomicBool::new(false)),
        });
        let err = decoder
            .start(CameraFacing::Environment, FrameConfig::default())
            .await
            .expect_err("open must fail");
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));

        // The source is retained, so a retry reaches open() again instead of
        // reporting the loop as already running.
        let err = decoder
            .start(CameraFacing::Environment, FrameConfig::default())
            .await
            .expect_err("retry fails the same way");
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_joins_worker_and_closes_source() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut decoder = QrDecoder::new(ScriptedSource {
            frames: Arc::new(Mutex::new(VecDeque::new())),
            fail_open: false,
            closed: closed.clone(),
        })
        .poll_interval(Duration::from_millis(1));

        let _scan_rx = decoder
            .start(CameraFacing::Environment, FrameConfig::default())
            .await
            .unwrap();
        decoder.stop().await;
        assert!(closed.load(Ordering::SeqCst));
        // stop is idempotent
        decoder.stop().await;
    }

    #[test]
    fn snapshot_source_requires_glue_directory() {
        let mut source = StillFrameSource::new("/nonexistent-glue-dir/latest.png");
        let err = source
            .open(CameraFacing::Environment, FrameConfig::default())
            .expect_err("missing glue directory");
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
    }

    #[test]
    fn snapshot_source_reports_a_frame_only_when_mtime_moves() {
        let dir = std::env::temp_dir().join(format!("attendance-cam-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("latest.png");
        blank_frame().save(&path).unwrap();

        let mut source = StillFrameSource::new(&path);
        source
            .open(CameraFacing::Environment, FrameConfig::default())
            .unwrap();
        assert!(source.next_frame().unwrap().is_some());
        // Unchanged file, no new frame.
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
