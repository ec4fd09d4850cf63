use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::error_detail;
use crate::api::types::{
    AuthenticatedUser, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
use crate::error::ApiError;

struct SessionState {
    access_token: String,
    refresh_token: String,
    user: AuthenticatedUser,
}

/// Owned auth lifecycle for one client: log in on page load, hand out the
/// bearer token, refresh when the access token expires, tear down on logout.
/// There is exactly one active token per session, held here rather than in
/// ambient globals.
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    state: RwLock<Option<SessionState>>,
}

impl Session {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            state: RwLock::new(None),
        }
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Auth(error_detail(response).await));
        }
        let body: LoginResponse = response.json().await?;
        info!(username = %body.user.username, role = %body.user.role, "logged in");
        let user = body.user.clone();
        *self.state.write().await = Some(SessionState {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            user: body.user,
        });
        Ok(user)
    }

    /// The current access token, for `Authorization: Bearer`.
    pub async fn bearer(&self) -> Result<String, ApiError> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| ApiError::Auth("no active session".to_string()))
    }

    pub async fn user(&self) -> Option<AuthenticatedUser> {
        self.state.read().await.as_ref().map(|s| s.user.clone())
    }

    /// Trades the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .state
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| ApiError::Auth("no active session".to_string()))?;
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Auth(error_detail(response).await));
        }
        let body: RefreshResponse = response.json().await?;
        if let Some(state) = self.state.write().await.as_mut() {
            state.access_token = body.access_token;
        }
        debug!("access token refreshed");
        Ok(())
    }

    /// Notifies the backend and drops the tokens. Local state is cleared
    /// even when the request fails, so a dead backend cannot pin a session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let bearer = self.bearer().await?;
        let result = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await;
        self.teardown().await;
        result?;
        Ok(())
    }

    pub async fn teardown(&self) {
        *self.state.write().await = None;
    }
}
