pub mod client;
pub mod session;
pub mod types;

pub use client::ApiClient;
pub use session::Session;

/// Pulls the backend's `{"detail": "..."}` rejection body out of an error
/// response, falling back to the HTTP status line.
pub(crate) async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<types::ErrorDetail>().await {
        Ok(body) => body.detail,
        Err(_) => status.to_string(),
    }
}
