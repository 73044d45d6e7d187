//! Bounded retry with exponential backoff and per-attempt timeouts.
//!
//! Transient failures (rate limits, timeouts, network faults, 5xx) are
//! retried up to `max_attempts`, sleeping `initial_backoff * 2^n` between
//! attempts and never longer than `max_backoff`. Terminal failures (content
//! filter, authentication, 4xx) propagate on the first occurrence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edupilot_config::{OrchestrationConfig, RetryConfig};
use edupilot_core::error::ProviderError;
use edupilot_core::provider::*;
use tracing::{info, warn};

/// A provider that retries its inner provider on transient failures.
pub struct RetryingProvider {
    inner: Arc<dyn edupilot_core::Provider>,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    attempt_timeout: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn edupilot_core::Provider>) -> Self {
        Self::from_config(inner, &OrchestrationConfig::default())
    }

    pub fn from_config(inner: Arc<dyn edupilot_core::Provider>, config: &OrchestrationConfig) -> Self {
        Self {
            inner,
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            attempt_timeout: Duration::from_secs(config.model_timeout_secs),
        }
        .with_retry(&config.retry)
    }

    pub fn with_retry(mut self, retry: &RetryConfig) -> Self {
        self.max_attempts = retry.max_attempts.max(1);
        self.initial_backoff = Duration::from_millis(retry.initial_backoff_ms);
        self.max_backoff = Duration::from_millis(retry.max_backoff_ms);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[async_trait]
impl edupilot_core::Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.attempt_timeout, self.inner.complete(request.clone()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "no response from '{}' within {}s",
                        self.inner.name(),
                        self.attempt_timeout.as_secs()
                    ))),
                };

            let error = match outcome {
                Ok(response) => {
                    if attempt > 1 {
                        info!(provider = %self.inner.name(), attempt, "Model call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                warn!(provider = %self.inner.name(), error = %error, "Terminal model failure, not retrying");
                return Err(error);
            }
            if attempt >= self.max_attempts {
                warn!(
                    provider = %self.inner.name(),
                    attempts = attempt,
                    error = %error,
                    "Transient model failure, retries exhausted"
                );
                return Err(error);
            }

            let delay = self.backoff(attempt - 1);
            warn!(
                provider = %self.inner.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient model failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
