use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::api::error_detail;
use crate::api::session::Session;
use crate::api::types::MarkResponse;
use crate::capture::controller::AttendanceMarker;
use crate::capture::types::MarkResult;
use crate::error::ApiError;

/// HTTP client for the attendance backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    async fn mark_once(&self, token: &str) -> Result<reqwest::Response, ApiError> {
        Ok(self
            .http
            .get(format!("{}/attendance/mark/{}", self.base_url, token))
            .bearer_auth(self.session.bearer().await?)
            .send()
            .await?)
    }
}

#[async_trait]
impl AttendanceMarker for ApiClient {
    async fn mark(&self, token: &str) -> Result<MarkResult, ApiError> {
        let mut response = self.mark_once(token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Access token expired mid-session; refresh once and retry.
            debug!("mark got 401, refreshing access token");
            self.session.refresh().await?;
            response = self.mark_once(token).await?;
        }

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            let body: MarkResponse = serde_json::from_slice(&bytes)?;
            return Ok(body.into_result());
        }
        if status.is_client_error() {
            // Invalid, inactive, or out-of-class token. Expected, recoverable.
            return Err(ApiError::Rejected(error_detail(response).await));
        }
        Err(ApiError::Status(status))
    }
}
