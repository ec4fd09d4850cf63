pub mod api;
pub mod capture;
pub mod config;
pub mod error;
pub mod presenter;

pub use error::{ApiError, AppError, CaptureError};

pub use api::{ApiClient, Session};
pub use capture::{
    AttendanceMarker, CameraFacing, CaptureLoop, CapturePhase, Decoder, FrameConfig, MarkResult,
    ScanEvent,
};
pub use presenter::{ConsolePresenter, Presenter};
