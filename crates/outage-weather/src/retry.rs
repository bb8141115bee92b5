//! Bounded exponential backoff around a single weather request.
//!
//! Transient failures (timeouts, refused connections, 5xx, 408, 429) are
//! retried. Anything else the API rejects, such as out-of-range coordinates
//! or an unknown hourly variable, is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use outage_core::RetrySettings;
use reqwest::{Response, StatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each further retry
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.initial_delay_ms,
            settings.max_delay_ms,
        )
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Wait before retry number `retry` (0-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Total attempts including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Whether a status is worth another attempt.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Whether a transport error is worth another attempt.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_request() || error.is_builder() {
        return false;
    }
    error.status().is_some_and(is_transient_status)
}

/// Send a request, retrying transient failures.
///
/// Returns the first response that is not transient, the last response once
/// attempts run out, or the last transport error.
pub async fn with_retry<F, Fut>(config: &RetryConfig, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut retry = 0;

    loop {
        let outcome = send().await;
        let exhausted = retry >= config.max_retries;

        match &outcome {
            Ok(response) if !is_transient_status(response.status()) || exhausted => {
                if retry > 0 {
                    tracing::info!("Weather request answered {} after {} retries", response.status(), retry);
                }
                return outcome;
            }
            Ok(response) => {
                tracing::warn!(
                    "Weather API returned {} (attempt {}/{})",
                    response.status(),
                    retry + 1,
                    config.attempts()
                );
            }
            Err(e) if !is_transient_error(e) => return outcome,
            Err(e) if exhausted => {
                tracing::error!("Weather request failed after {} attempts: {}", config.attempts(), e);
                return outcome;
            }
            Err(e) => {
                tracing::warn!(
                    "Weather request failed (attempt {}/{}): {}",
                    retry + 1,
                    config.attempts(),
                    e
                );
            }
        }

        tokio::time::sleep(config.backoff(retry)).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_settings() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.attempts(), 6);
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_doubles() {
        let config = RetryConfig::new(5, 200, 10_000);
        let delays: Vec<u128> = (0..4).map(|r| config.backoff(r).as_millis()).collect();
        assert_eq!(delays, vec![200, 400, 800, 1600]);
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig::new(10, 100, 1000);
        assert_eq!(config.backoff(4), Duration::from_millis(1000));
        assert_eq!(config.backoff(40), Duration::from_millis(1000));
        assert_eq!(config.backoff(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_transient_statuses() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(is_transient_status(status), "{status}");
        }
        for status in [StatusCode::OK, StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND] {
            assert!(!is_transient_status(status), "{status}");
        }
    }
}
