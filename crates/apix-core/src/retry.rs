//! Bounded retries with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::ConnectorError;

/// Capped exponential backoff: the wait after failed attempt `i` (0-based) is
/// `min(cap, base * 2^i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            cap: Duration::from_millis(2_000),
        }
    }
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        1_u32
            .checked_shl(attempt)
            .and_then(|scale| self.base.checked_mul(scale))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// Retry budget for one logical exchange; `max_retries + 1` sends at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 5xx responses are transient; every other status is final.
    pub const fn should_retry_status(&self, status: u16) -> bool {
        status >= 500
    }
}

/// Sleeps for `delay` unless `cancel` fires first.
pub async fn sleep_cancellable(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), ConnectorError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConnectorError::Cancelled { during: "backoff" }),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Executes one logical HTTP exchange with bounded retries.
///
/// Transport failures and 5xx responses are retried until the attempt budget
/// runs out. On the last attempt a 5xx response is returned for the caller to
/// interpret, while a transport failure becomes [`ConnectorError::Communication`].
/// Any other status is returned immediately.
#[derive(Clone)]
pub struct RetryingInvoker {
    client: Arc<dyn HttpClient>,
    config: RetryConfig,
    cancel: CancellationToken,
}

impl RetryingInvoker {
    pub fn new(
        client: Arc<dyn HttpClient>,
        config: RetryConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ConnectorError> {
        let max_attempts = self.config.max_attempts();

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 >= max_attempts;

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(ConnectorError::Cancelled { during: "http send" });
                }
                outcome = self.client.execute(request.clone()) => outcome,
            };

            match outcome {
                Ok(response) if self.config.should_retry_status(response.status) && !is_last => {
                    debug!(
                        url = loggable_url(&request.url),
                        attempt,
                        status = response.status,
                        "server error, retrying"
                    );
                }
                Ok(response) => return Ok(response),
                Err(error) if is_last || !error.is_retryable() => {
                    return Err(ConnectorError::communication(error.to_string()));
                }
                Err(error) => {
                    debug!(
                        url = loggable_url(&request.url),
                        attempt,
                        error = %error,
                        "transport failure, retrying"
                    );
                }
            }

            sleep_cancellable(self.config.backoff.delay(attempt), &self.cancel).await?;
        }

        Err(ConnectorError::communication("retry budget exhausted"))
    }
}

/// Query strings can carry the issuance code; only the path is logged.
fn loggable_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
