//! Retry of transient Google API failures.
//!
//! A failure is retried only when it carries a `429` or `5xx` status; waits
//! grow exponentially with +/- jitter and are capped by `max_delay_ms`.

pub mod policy;
pub mod types;

pub use policy::{RetryContext, RetryPolicy, MIN_RETRY_DELAY};
pub use types::{RetryConfig, RetryReason};
