pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod transport;

pub use crate::config::GatewayConfig;
pub use crate::credentials::Credentials;
pub use crate::error::{GatewayError, Result};
pub use crate::gateway::{DriveApi, ServiceGateway, SheetsApi, SlidesApi, Surface};
pub use crate::rate_limit::{Algorithm, Channel, RateLimitConfig, RateLimiter};
pub use crate::registry::GatewayRegistry;
pub use crate::retry::{RetryConfig, RetryPolicy};
pub use crate::transport::{RequestParams, RestClient};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gapi_gateway=info".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
