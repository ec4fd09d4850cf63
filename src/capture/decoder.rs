use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::capture::types::ScanEvent;
use crate::error::CaptureError;

/// Which camera to request from the device glue. Rear facing is preferred
/// for scanning codes held up by students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Environment,
    User,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// A camera-backed code decoder.
///
/// `start` acquires the camera and yields the channel scan events arrive on.
/// `pause` gates decoding without releasing the device, so no event can be
/// produced while a previous one is still being handled. `stop` releases the
/// camera and is safe to call more than once.
#[async_trait]
pub trait Decoder: Send {
    async fn start(
        &mut self,
        facing: CameraFacing,
        frame: FrameConfig,
    ) -> Result<mpsc::Receiver<ScanEvent>, CaptureError>;

    fn pause(&self);

    fn resume(&self);

    async fn stop(&mut self);
}
