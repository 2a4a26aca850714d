//! Rate limiting module
//!
//! Call budgets for the Google API surfaces, enforced in-process with one of
//! two algorithms:
//!
//! - **Token Bucket**: continuous refill with burst support up to a capacity
//! - **Leaky Bucket**: fixed minimum interval between calls, no bursts
//!
//! Both run in either *dual* mode (independent `read` and `write` budgets) or
//! *single* mode (one budget, the channel argument is ignored).
//!
//! # Example
//!
//! ```rust,no_run
//! use gapi_gateway::rate_limit::{Algorithm, Channel, RateLimitConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Slides: 600 reads/min, 60 writes/min
//!     let limiter = RateLimitConfig::dual(600.0, 60.0)
//!         .with_algorithm(Algorithm::TokenBucket)
//!         .build()
//!         .unwrap();
//!
//!     limiter.acquire(Channel::Write).await;
//! }
//! ```

pub mod leaky_bucket;
pub mod token_bucket;
pub mod types;

pub use leaky_bucket::LeakyBucket;
pub use token_bucket::TokenBucket;
pub use types::{Algorithm, Channel, ChannelMode, RateLimitConfig, RateLimiter};
