use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling for the un-jittered wait in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive waits
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Randomization amplitude, 0.2 means +/-20%
    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: f64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    60000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter_fraction() -> f64 {
    0.2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            jitter_fraction: default_jitter_fraction(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Validate retry tuning
    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(GatewayError::Config(
                "Retry base_delay_ms must be > 0".to_string(),
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(GatewayError::Config(format!(
                "Retry base_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(GatewayError::Config(format!(
                "Retry backoff_factor must be >= 1, got {}",
                self.backoff_factor
            )));
        }
        if !(0.0..1.0).contains(&self.jitter_fraction) {
            return Err(GatewayError::Config(format!(
                "Retry jitter_fraction must be in [0, 1), got {}",
                self.jitter_fraction
            )));
        }
        Ok(())
    }
}

/// Why a dispatch is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// 429 Too Many Requests
    RateLimited,
    /// Any 5xx
    ServerError(u16),
}

impl RetryReason {
    pub fn from_status(status: u16) -> Self {
        if status == 429 {
            RetryReason::RateLimited
        } else {
            RetryReason::ServerError(status)
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryReason::RateLimited => "rate_limit",
            RetryReason::ServerError(_) => "server_error",
        }
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::RateLimited => write!(f, "Rate limit exceeded (429)"),
            RetryReason::ServerError(status) => write!(f, "Server error ({})", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 5000);
        assert_eq!(config.max_delay_ms, 60000);
        assert_eq!(config.backoff_factor, 2.0);
        assert_eq!(config.jitter_fraction, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_config_partial_yaml() {
        let config: RetryConfig = serde_yaml::from_str("base_delay_ms: 1000").unwrap();
        assert_eq!(config.base_delay(), Duration::from_secs(1));
        assert_eq!(config.max_delay(), Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_retry_config_validation() {
        let invalid = [
            RetryConfig {
                base_delay_ms: 0,
                ..Default::default()
            },
            RetryConfig {
                base_delay_ms: 120_000,
                ..Default::default()
            },
            RetryConfig {
                backoff_factor: 0.5,
                ..Default::default()
            },
            RetryConfig {
                jitter_fraction: 1.0,
                ..Default::default()
            },
            RetryConfig {
                jitter_fraction: -0.1,
                ..Default::default()
            },
        ];

        for config in invalid {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_retry_reason_display() {
        assert_eq!(
            RetryReason::from_status(429).to_string(),
            "Rate limit exceeded (429)"
        );
        assert_eq!(
            RetryReason::from_status(503).to_string(),
            "Server error (503)"
        );
        assert_eq!(RetryReason::from_status(500).as_str(), "server_error");
    }
}
