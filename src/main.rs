use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn, Level};

use qr_attendance_client::api::{ApiClient, Session};
use qr_attendance_client::capture::camera::{QrDecoder, StillFrameSource};
use qr_attendance_client::capture::{CaptureLoop, FrameConfig};
use qr_attendance_client::config::Configuration;
use qr_attendance_client::error::{ApiError, AppError};
use qr_attendance_client::presenter::ConsolePresenter;

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let configuration = Configuration::load(config_path.as_deref())?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(configuration.api.timeout_secs))
        .build()
        .map_err(ApiError::from)?;

    let session = Arc::new(Session::new(http.clone(), configuration.api.base_url.clone()));
    session
        .login(&configuration.auth.username, &configuration.auth.password)
        .await?;

    let decoder = QrDecoder::new(StillFrameSource::new(&configuration.camera.snapshot_path))
        .poll_interval(Duration::from_millis(configuration.camera.poll_interval_ms));
    let marker = Arc::new(ApiClient::new(
        http,
        configuration.api.base_url.clone(),
        session.clone(),
    ));

    let mut capture = CaptureLoop::builder()
        .decoder(Box::new(decoder))
        .marker(marker)
        .presenter(Arc::new(ConsolePresenter))
        .facing(configuration.camera.facing)
        .frame_config(FrameConfig {
            fps: configuration.camera.fps,
            width: configuration.camera.frame_width,
            height: configuration.camera.frame_height,
        })
        .display_delay(Duration::from_millis(configuration.capture.display_delay_ms))
        .build()?;

    capture.start().await?;
    info!("attendance capture running, press ctrl-c to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    capture.stop().await;
    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }
    Ok(())
}
