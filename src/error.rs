use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Api Error: {0}")]
    Api(#[from] ApiError),
    #[error("Config Error: {0}")]
    Config(#[from] config::ConfigError),
}

// Capture Loop Error Type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("Decoder failure: {0}")]
    Decoder(String),
    #[error("The capture loop is already running.")]
    AlreadyStarted,
    #[error("Capture loop is not configured: {0}")]
    Setup(String),
}

// Backend Api Error Type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Mark rejected: {0}")]
    Rejected(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server error: {0}")]
    Status(reqwest::StatusCode),
    #[error("Unexpected response body: {0}")]
    Body(#[from] serde_json::Error),
}
