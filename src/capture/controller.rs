use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::decoder::{CameraFacing, Decoder, FrameConfig};
use crate::capture::state::CapturePhase;
use crate::capture::types::{MarkResult, ScanEvent};
use crate::error::{ApiError, CaptureError};
use crate::presenter::Presenter;

pub const DEFAULT_DISPLAY_DELAY: Duration = Duration::from_millis(3000);

const NETWORK_FAILURE_BANNER: &str = "Could not reach the attendance service";

/// Records one attendance entry for a decoded token.
#[async_trait]
pub trait AttendanceMarker: Send + Sync {
    async fn mark(&self, token: &str) -> Result<MarkResult, ApiError>;
}

/// Drives the scan/mark/display/resume cycle.
///
/// One scan is in flight at a time: the decoder is paused from the moment a
/// scan event is taken until `resume_scanning` runs after the result banner
/// delay. Marking failures are never fatal; only camera acquisition failure
/// stops the loop, and it is never retried without an explicit `start`.
struct CaptureController {
    decoder: Box<dyn Decoder>,
    marker: Arc<dyn AttendanceMarker>,
    presenter: Arc<dyn Presenter>,
    facing: CameraFacing,
    frame: FrameConfig,
    display_delay: Duration,
    cancel: CancellationToken,
    phase_tx: watch::Sender<CapturePhase>,
    scan_rx: Option<mpsc::Receiver<ScanEvent>>,
}

impl CaptureController {
    fn set_phase(&self, phase: CapturePhase) {
        let _ = self.phase_tx.send(phase);
    }

    async fn acquire(&mut self) -> Result<(), CaptureError> {
        match self.decoder.start(self.facing, self.frame).await {
            Ok(scan_rx) => {
                self.scan_rx = Some(scan_rx);
                self.set_phase(CapturePhase::Scanning);
                info!(facing = ?self.facing, "camera acquired, scanning");
                Ok(())
            }
            Err(e) => {
                self.set_phase(CapturePhase::Stopped);
                self.presenter.show_result(&MarkResult::Failure {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(mut self) {
        let mut scan_rx = match self.scan_rx.take() {
            Some(scan_rx) => scan_rx,
            None => {
                self.shutdown().await;
                return;
            }
        };
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                scan = scan_rx.recv() => match scan {
                    Some(event) => {
                        if !self.handle_scan(event).await {
                            break;
                        }
                    }
                    None => {
                        warn!("decoder channel closed");
                        break;
                    }
                },
            }
        }
        self.shutdown().await;
    }

    /// Returns `false` when the loop was stopped while this scan was being
    /// marked or displayed.
    async fn handle_scan(&mut self, event: ScanEvent) -> bool {
        self.decoder.pause();
        self.set_phase(CapturePhase::Marking);
        info!(scan_id = %event.scan_id, "submitting decoded token");

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            outcome = self.marker.mark(&event.raw_text) => outcome,
        };
        let result = match outcome {
            Ok(result) => result,
            Err(ApiError::Rejected(reason)) => MarkResult::Failure { reason },
            Err(e) => {
                warn!(scan_id = %event.scan_id, error = %e, "attendance call failed");
                MarkResult::Failure {
                    reason: NETWORK_FAILURE_BANNER.to_string(),
                }
            }
        };

        self.set_phase(CapturePhase::Displaying);
        self.presenter.show_result(&result);

        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            _ = tokio::time::sleep(self.display_delay) => {}
        }
        self.resume_scanning();
        true
    }

    /// The single restart point of the loop. Invoked only from the display
    /// delay, never from inside a decode callback, so stopping and starting
    /// the loop cannot accumulate duplicate decode registrations.
    fn resume_scanning(&mut self) {
        if *self.phase_tx.borrow() != CapturePhase::Displaying {
            return;
        }
        self.presenter.clear_result();
        self.decoder.resume();
        self.set_phase(CapturePhase::Scanning);
    }

    async fn shutdown(&mut self) {
        self.decoder.stop().await;
        self.set_phase(CapturePhase::Stopped);
    }
}

/// Handle to a running capture loop.
pub struct CaptureLoop {
    controller: Option<CaptureController>,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    phase_rx: watch::Receiver<CapturePhase>,
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("phase", &*self.phase_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl CaptureLoop {
    pub fn builder() -> CaptureLoopBuilder {
        CaptureLoopBuilder::new()
    }

    /// Acquires the camera and begins the cycle.
    ///
    /// A `CameraUnavailable` error leaves the loop in `Stopped` with a
    /// user-visible banner; the camera is not re-requested until `start` is
    /// called again, so permission prompts cannot be retriggered silently.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        let mut controller = self
            .controller
            .take()
            .ok_or(CaptureError::AlreadyStarted)?;
        match controller.acquire().await {
            Ok(()) => {
                self.task = Some(tokio::spawn(controller.run()));
                Ok(())
            }
            Err(e) => {
                self.controller = Some(controller);
                Err(e)
            }
        }
    }

    pub fn phase(&self) -> CapturePhase {
        *self.phase_rx.borrow()
    }

    pub fn phase_watch(&self) -> watch::Receiver<CapturePhase> {
        self.phase_rx.clone()
    }

    /// Releases the camera from any state and cancels a pending resume
    /// delay. Safe to call more than once.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(mut controller) = self.controller.take() {
            // Never started or camera acquisition failed: release directly.
            controller.shutdown().await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct CaptureLoopBuilder {
    decoder: Option<Box<dyn Decoder>>,
    marker: Option<Arc<dyn AttendanceMarker>>,
    presenter: Option<Arc<dyn Presenter>>,
    facing: CameraFacing,
    frame: FrameConfig,
    display_delay: Duration,
}

impl CaptureLoopBuilder {
    pub fn new() -> Self {
        Self {
            decoder: None,
            marker: None,
            presenter: None,
            facing: CameraFacing::Environment,
            frame: FrameConfig::default(),
            display_delay: DEFAULT_DISPLAY_DELAY,
        }
    }

    pub fn decoder(mut self, decoder: Box<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn marker(mut self, marker: Arc<dyn AttendanceMarker>) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn facing(mut self, facing: CameraFacing) -> Self {
        self.facing = facing;
        self
    }

    pub fn frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn display_delay(mut self, display_delay: Duration) -> Self {
        self.display_delay = display_delay;
        self
    }

    pub fn build(self) -> Result<CaptureLoop, CaptureError> {
        let decoder = self
            .decoder
            .ok_or(CaptureError::Setup("decoder not set".to_string()))?;
        let marker = self
            .marker
            .ok_or(CaptureError::Setup("marker not set".to_string()))?;
        let presenter = self
            .presenter
            .ok_or(CaptureError::Setup("presenter not set".to_string()))?;

        let cancel = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(CapturePhase::Idle);
        Ok(CaptureLoop {
            controller: Some(CaptureController {
                decoder,
                marker,
                presenter,
                facing: self.facing,
                frame: self.frame,
                display_delay: self.display_delay,
                cancel: cancel.clone(),
                phase_tx,
                scan_rx: None,
            }),
            task: None,
            cancel,
            phase_rx,
        })
    }
}

impl Default for CaptureLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
