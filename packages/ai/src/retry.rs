//! HTTP retry for vision provider calls.
//!
//! Providers send through [`send_with_retry`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every classifier request
//! gets exponential backoff on transient failures (timeouts, connection
//! resets, rate limiting, server errors).
//!
//! ```ignore
//! let resp = retry::send_with_retry(|| client.post(&url).json(&request)).await?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;

use crate::AiError;

/// Maximum number of retries after the first attempt.
///
/// With exponential backoff (1s, 2s, 4s) the total wait before giving up is
/// 7 seconds.
pub const MAX_RETRIES: u32 = 3;

/// Sends a request, retrying transient failures with exponential backoff.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Connection errors, timeouts, HTTP 429, and HTTP 5xx are retried up to
/// [`MAX_RETRIES`] times. Any other response, including a 4xx or a
/// retryable status that persisted through every retry, is returned to the
/// caller so the provider can extract its error body.
///
/// # Errors
///
/// Returns [`AiError::Http`] if the request could not be sent, either
/// because the error is permanent or because retries were exhausted.
#[allow(clippy::future_not_send)]
pub async fn send_with_retry<F>(build_request: F) -> Result<reqwest::Response, AiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    log::warn!("  transient error: {e}; retry {attempt}/{MAX_RETRIES} in {delay:?}");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(AiError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    log::warn!("  HTTP {status}; retry {attempt}/{MAX_RETRIES} in {delay:?}");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                if is_retryable_status(status) {
                    log::error!("HTTP {status} after {MAX_RETRIES} retries, giving up");
                }
                return Ok(response);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ...
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(16))
}

/// Returns `true` for statuses worth retrying: 429 and any 5xx.
#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
