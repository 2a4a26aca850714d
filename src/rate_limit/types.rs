use super::leaky_bucket::LeakyBucket;
use super::token_bucket::TokenBucket;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Budget a call is charged against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Read-only queries
    Read,
    /// Creating, mutating and deleting calls
    Write,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Read => "read",
            Channel::Write => "write",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" => Ok(Channel::Read),
            "write" => Ok(Channel::Write),
            other => Err(GatewayError::InvalidArgument(format!(
                "channel must be 'read' or 'write', got '{}'",
                other
            ))),
        }
    }
}

/// Whether a limiter keeps separate read and write budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// One undifferentiated budget; the channel argument is ignored
    Single,
    /// Independent read and write budgets
    Dual,
}

/// Rate limiting algorithm
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Refillable counter; bursts up to capacity
    TokenBucket,
    /// Fixed minimum interval between calls; no bursts
    #[default]
    LeakyBucket,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::TokenBucket => write!(f, "token_bucket"),
            Algorithm::LeakyBucket => write!(f, "leaky_bucket"),
        }
    }
}

/// Rate limit configuration for one API surface.
///
/// Rates are permits per 60-second window. Leaving `write_rate` unset
/// selects single-channel mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Algorithm to enforce the budget with
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Read permits per minute (all permits in single-channel mode)
    pub read_rate: f64,
    /// Write permits per minute
    #[serde(default)]
    pub write_rate: Option<f64>,
    /// Read burst size (token bucket only, defaults to `read_rate`)
    #[serde(default)]
    pub read_capacity: Option<f64>,
    /// Write burst size (token bucket only, defaults to `write_rate`)
    #[serde(default)]
    pub write_capacity: Option<f64>,
}

impl RateLimitConfig {
    /// Single-channel budget of `rate` permits per minute
    pub fn single(rate: f64) -> Self {
        Self {
            algorithm: Algorithm::default(),
            read_rate: rate,
            write_rate: None,
            read_capacity: None,
            write_capacity: None,
        }
    }

    /// Independent read and write budgets
    pub fn dual(read_rate: f64, write_rate: f64) -> Self {
        Self {
            write_rate: Some(write_rate),
            ..Self::single(read_rate)
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_capacity(mut self, read: f64, write: Option<f64>) -> Self {
        self.read_capacity = Some(read);
        self.write_capacity = write;
        self
    }

    pub fn mode(&self) -> ChannelMode {
        if self.write_rate.is_some() {
            ChannelMode::Dual
        } else {
            ChannelMode::Single
        }
    }

    /// Read burst size.
    ///
    /// Never below one token: a bucket that cannot hold a whole token would
    /// never hand one out, so rates under 1/min still get a single permit.
    pub fn read_burst(&self) -> f64 {
        self.read_capacity.unwrap_or(self.read_rate).max(1.0)
    }

    /// Write burst size, `None` in single-channel mode
    pub fn write_burst(&self) -> Option<f64> {
        self.write_rate
            .map(|rate| self.write_capacity.unwrap_or(rate).max(1.0))
    }

    /// Validate rates and capacities
    pub fn validate(&self) -> Result<()> {
        check_positive("read_rate", self.read_rate)?;
        interval_for(self.read_rate)?;
        if let Some(rate) = self.write_rate {
            check_positive("write_rate", rate)?;
            interval_for(rate)?;
        }

        if self.algorithm == Algorithm::TokenBucket {
            if let Some(capacity) = self.read_capacity {
                check_positive("read_capacity", capacity)?;
            }
            if let (Some(_), Some(capacity)) = (self.write_rate, self.write_capacity) {
                check_positive("write_capacity", capacity)?;
            }
        }

        Ok(())
    }

    /// Build the limiter described by this configuration
    pub fn build(&self) -> Result<Box<dyn RateLimiter>> {
        self.validate()?;
        let limiter: Box<dyn RateLimiter> = match self.algorithm {
            Algorithm::TokenBucket => Box::new(TokenBucket::new(self)?),
            Algorithm::LeakyBucket => Box::new(LeakyBucket::new(self)?),
        };
        Ok(limiter)
    }
}

/// Spacing between two permits at `rate` per minute
pub(crate) fn interval_for(rate: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(60.0 / rate).map_err(|_| {
        GatewayError::Config(format!(
            "rate {} per minute is too small to schedule",
            rate
        ))
    })
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GatewayError::Config(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// A call budget shared by every task using one API surface.
///
/// `acquire` suspends until a permit is available and then consumes it. It
/// never fails and has no timeout; wrap it in `tokio::time::timeout` when a
/// bound is needed.
#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Wait for and consume one permit on `channel`
    async fn acquire(&self, channel: Channel);

    /// Channel layout of this limiter
    fn mode(&self) -> ChannelMode;

    /// Permits per minute granted on `channel`
    fn rate(&self, channel: Channel) -> f64;

    /// Acquire by channel name.
    ///
    /// Dual-channel limiters only accept `"read"` and `"write"`; single-channel
    /// limiters accept any name.
    async fn acquire_named(&self, name: &str) -> Result<()> {
        let channel = match self.mode() {
            ChannelMode::Single => Channel::Read,
            ChannelMode::Dual => name.parse()?,
        };
        self.acquire(channel).await;
        Ok(())
    }
}

/// Per-channel storage; single-channel mode only has the read slot and routes
/// every channel to it.
#[derive(Debug)]
pub(crate) struct ChannelSlots<T> {
    read: T,
    write: Option<T>,
}

impl<T> ChannelSlots<T> {
    pub(crate) fn new(read: T, write: Option<T>) -> Self {
        Self { read, write }
    }

    pub(crate) fn mode(&self) -> ChannelMode {
        if self.write.is_some() {
            ChannelMode::Dual
        } else {
            ChannelMode::Single
        }
    }

    /// The channel a request is actually charged against
    pub(crate) fn resolve(&self, channel: Channel) -> Channel {
        match self.mode() {
            ChannelMode::Single => Channel::Read,
            ChannelMode::Dual => channel,
        }
    }

    pub(crate) fn get(&self, channel: Channel) -> &T {
        match (channel, self.write.as_ref()) {
            (Channel::Write, Some(write)) => write,
            _ => &self.read,
        }
    }

    pub(crate) fn get_mut(&mut self, channel: Channel) -> &mut T {
        match (channel, self.write.as_mut()) {
            (Channel::Write, Some(write)) => write,
            _ => &mut self.read,
        }
    }
}
