//! OpenAI client configuration with sensible defaults.

use crate::error::{Result, TldwError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with an optional custom endpoint and a request timeout.
///
/// The API key is read from `OPENAI_API_KEY`. The client's own rate-limit
/// retry is disabled: every call sends exactly one HTTP request and retries
/// are left to [`crate::completion::RetryPolicy`].
pub fn create_client_with(base_url: Option<&str>, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TldwError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(url) = base_url {
        config = config.with_api_base(url.trim_end_matches('/'));
    }

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry_backoff()))
}

/// A backoff that gives up after the first failure.
fn no_retry_backoff() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}
