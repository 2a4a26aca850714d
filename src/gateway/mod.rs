//! Rate-limited, retrying gateways in front of each Google API surface.
//!
//! [`ServiceGateway`] is the shared core: it charges one permit per logical
//! call on the surface's [`RateLimiter`] and then runs the dispatch under the
//! [`RetryPolicy`]. [`DriveApi`], [`SheetsApi`] and [`SlidesApi`] expose the
//! REST operations of their surface with the same names as the transport and
//! route each to the read or write budget.

pub mod drive;
pub mod sheets;
pub mod slides;

pub use drive::DriveApi;
pub use sheets::SheetsApi;
pub use slides::SlidesApi;

use crate::error::{GatewayError, Result};
use crate::metrics;
use crate::rate_limit::{Channel, RateLimitConfig, RateLimiter};
use crate::retry::{RetryConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// A Google API with its own quota
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Drive,
    Sheets,
    Slides,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Drive, Surface::Sheets, Surface::Slides];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Drive => "drive",
            Surface::Sheets => "sheets",
            Surface::Slides => "slides",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drive" => Ok(Surface::Drive),
            "sheets" => Ok(Surface::Sheets),
            "slides" => Ok(Surface::Slides),
            other => Err(GatewayError::InvalidArgument(format!(
                "unknown surface '{}'",
                other
            ))),
        }
    }
}

/// Limiter and retry policy wrapped around one transport
#[derive(Debug)]
pub struct ServiceGateway<T> {
    surface: Surface,
    transport: Arc<T>,
    limiter: Box<dyn RateLimiter>,
    retry: RetryPolicy,
}

impl<T> ServiceGateway<T> {
    /// Build the limiter described by `limits` and validate `retry`
    pub fn new(
        surface: Surface,
        transport: Arc<T>,
        limits: &RateLimitConfig,
        retry: RetryConfig,
    ) -> Result<Self> {
        retry.validate()?;
        let limiter = limits.build()?;

        info!(
            surface = %surface,
            algorithm = %limits.algorithm,
            read_rate = limits.read_rate,
            write_rate = ?limits.write_rate,
            max_retries = retry.max_retries,
            "Gateway initialized"
        );

        Ok(Self::with_limiter(
            surface,
            transport,
            limiter,
            RetryPolicy::new(retry),
        ))
    }

    /// Assemble a gateway from an already built limiter
    pub fn with_limiter(
        surface: Surface,
        transport: Arc<T>,
        limiter: Box<dyn RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            surface,
            transport,
            limiter,
            retry,
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Charge one permit on `channel`, then run `op` under the retry policy.
    ///
    /// `op` must perform exactly one dispatch per invocation. Retries reuse
    /// the permit taken here.
    pub async fn call<F, Fut, R>(&self, channel: Channel, operation: &'static str, op: F) -> Result<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.limiter.acquire(channel).await;
        metrics::record_api_call(self.surface, operation, channel);
        debug!(
            surface = %self.surface,
            operation = operation,
            channel = %channel,
            "Dispatching API call"
        );

        let result = self.retry.execute(op).await;

        if let Err(err) = &result {
            metrics::record_api_failure(self.surface, err.class());
            debug!(
                surface = %self.surface,
                operation = operation,
                error = %err,
                "API call failed"
            );
        }

        result
    }

    /// Charge one permit on `channel` and build, but do not send, a request.
    ///
    /// Used for streamed media where the caller drives the download itself.
    /// Nothing is retried.
    pub async fn prepare<F, R>(&self, channel: Channel, operation: &'static str, build: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<R>,
    {
        self.limiter.acquire(channel).await;
        metrics::record_api_call(self.surface, operation, channel);
        debug!(
            surface = %self.surface,
            operation = operation,
            channel = %channel,
            "Preparing media request"
        );

        build(&self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::ChannelMode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn gateway(limits: RateLimitConfig) -> ServiceGateway<()> {
        let retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 100,
            ..RetryConfig::default()
        };
        ServiceGateway::new(Surface::Sheets, Arc::new(()), &limits, retry).unwrap()
    }

    #[test]
    fn test_surface_names() {
        for surface in Surface::ALL {
            assert_eq!(surface.as_str().parse::<Surface>().unwrap(), surface);
        }
        assert_eq!(Surface::Slides.to_string(), "slides");
        assert!("Drive".parse::<Surface>().is_err());
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let result = ServiceGateway::new(
            Surface::Drive,
            Arc::new(()),
            &RateLimitConfig::single(0.0),
            RetryConfig::default(),
        );
        assert!(matches!(result, Err(GatewayError::Config(_))));

        let retry = RetryConfig {
            backoff_factor: 0.5,
            ..RetryConfig::default()
        };
        let result = ServiceGateway::new(
            Surface::Drive,
            Arc::new(()),
            &RateLimitConfig::single(60.0),
            retry,
        );
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_retries_without_reacquiring() {
        // one write permit per minute: a second acquire would stall the test
        let gateway = gateway(RateLimitConfig::dual(60.0, 1.0));
        assert_eq!(gateway.limiter().mode(), ChannelMode::Dual);
        let attempts = AtomicU32::new(0);

        let result = gateway
            .call(Channel::Write, "batch_update", || {
                let current = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if current < 2 {
                        Err(GatewayError::Http {
                            status: 503,
                            message: "unavailable".to_string(),
                        })
                    } else {
                        Ok(current)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_does_not_dispatch_twice() {
        let gateway = gateway(RateLimitConfig::single(60.0));
        let built = AtomicU32::new(0);

        let result = gateway
            .prepare(Channel::Read, "get_media", |_| {
                built.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GatewayError::Http {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
