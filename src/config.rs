use std::path::Path;

use serde::Deserialize;

use crate::capture::decoder::CameraFacing;

const ENV_PREFIX: &str = "ATTENDANCE";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Configuration {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub facing: CameraFacing,
    pub fps: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Snapshot file written by the camera glue, polled by the decoder.
    pub snapshot_path: String,
    pub poll_interval_ms: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Environment,
            fps: 10,
            frame_width: 640,
            frame_height: 480,
            snapshot_path: "camera/latest.png".to_string(),
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub display_delay_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            display_delay_ms: 3000,
        }
    }
}

impl Configuration {
    /// Loads settings from an optional file, with `ATTENDANCE__*` environment
    /// variables layered on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut settings = config::Config::builder();

        if let Some(path) = config_path {
            settings = settings.add_source(config::File::from(path).required(true));
        }

        settings
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
