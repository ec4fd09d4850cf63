pub mod camera;
pub mod controller;
pub mod decoder;
pub mod state;
pub mod types;

pub use controller::{AttendanceMarker, CaptureLoop, CaptureLoopBuilder};
pub use decoder::{CameraFacing, Decoder, FrameConfig};
pub use state::CapturePhase;
pub use types::{MarkResult, ScanEvent};
