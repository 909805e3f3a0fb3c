//! HTTP adapters for the hosted services a run talks to.
//!
//! - [`upstash`]: visited set on Upstash Redis (REST)
//! - [`twitter`]: X API v2 posting and media upload
//! - [`ideogram`]: image generation for the illustrated variant
//!
//! Every adapter borrows the same [`reqwest::Client`] built by
//! [`http_client`], so the timeout and user agent apply everywhere.

pub mod ideogram;
pub mod twitter;
pub mod upstash;

use crate::error::{Result, RunError};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RunError::Config(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into [`RunError::Fetch`], keeping the body for
/// the log.
pub(crate) async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, what, body = %crate::utils::truncate_for_log(&body, 300), "Request failed");
    Err(RunError::Fetch(format!("{what} returned {status}")))
}
