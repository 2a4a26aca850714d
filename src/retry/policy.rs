use super::types::{RetryConfig, RetryReason};
use crate::error::{ErrorClass, Result};
use crate::metrics;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Shortest wait between two attempts, whatever the jitter
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Retries transient API failures with jittered exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Fresh per-call retry state
    pub fn context(&self) -> RetryContext {
        RetryContext::new(&self.config)
    }

    /// Run `operation` until it succeeds, fails fatally, or retries run out.
    ///
    /// Each invocation of `operation` must perform exactly one dispatch. Only
    /// errors carrying 429 or a 5xx status are retried; after the last retry
    /// the final error is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut context = self.context();

        loop {
            let err = match operation().await {
                Ok(result) => {
                    if context.attempt() > 0 {
                        debug!(
                            attempt = context.attempt(),
                            "Request succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };

            let status = match (err.class(), err.status()) {
                (ErrorClass::Retryable, Some(status)) => status,
                _ => {
                    debug!(error = %err, "Error not retryable");
                    return Err(err);
                }
            };
            let reason = RetryReason::from_status(status);

            if !context.can_retry() {
                warn!(
                    reason = %reason,
                    max_retries = self.config.max_retries,
                    error = %err,
                    "{}. Max retries ({}) reached",
                    reason,
                    self.config.max_retries
                );
                return Err(err);
            }

            let wait = context.next_delay();
            warn!(
                reason = %reason,
                attempt = context.attempt(),
                max_retries = self.config.max_retries,
                wait_ms = wait.as_millis() as u64,
                "{}. Retrying in {:.1} seconds... (attempt {}/{})",
                reason,
                wait.as_secs_f64(),
                context.attempt(),
                self.config.max_retries
            );
            metrics::record_retry(reason);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Retry state of one top-level call
pub struct RetryContext {
    attempt: u32,
    max_retries: u32,
    backoff: ExponentialBackoff,
}

impl std::fmt::Debug for RetryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryContext")
            .field("attempt", &self.attempt)
            .field("max_retries", &self.max_retries)
            .field("next_interval", &self.backoff.current_interval)
            .finish()
    }
}

impl RetryContext {
    fn new(config: &RetryConfig) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(config.base_delay())
            .with_max_interval(config.max_delay())
            .with_multiplier(config.backoff_factor)
            .with_randomization_factor(config.jitter_fraction)
            .with_max_elapsed_time(None) // We handle max retries manually
            .build();

        Self {
            attempt: 0,
            max_retries: config.max_retries,
            backoff,
        }
    }

    /// Retries performed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// Wait before the next attempt; advances the attempt counter.
    ///
    /// `min(base * factor^attempt, max)` scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]`, never below [`MIN_RETRY_DELAY`].
    pub fn next_delay(&mut self) -> Duration {
        // without an elapsed-time limit the backoff never runs dry
        let wait = self
            .backoff
            .next_backoff()
            .unwrap_or(self.backoff.max_interval);
        self.attempt += 1;
        wait.max(MIN_RETRY_DELAY)
    }
}
