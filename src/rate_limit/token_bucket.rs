use super::types::{
    interval_for, Channel, ChannelMode, ChannelSlots, RateLimitConfig, RateLimiter,
};
use crate::error::Result;
use crate::metrics;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Slack for floating point drift when a refill lands exactly on one token
const TOKEN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct BucketLimits {
    /// Tokens per minute
    rate: f64,
    capacity: f64,
    /// Time to earn one token
    interval: Duration,
}

impl BucketLimits {
    fn new(rate: f64, capacity: f64) -> Result<Self> {
        Ok(Self {
            rate,
            capacity,
            interval: interval_for(rate)?,
        })
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn full(limits: BucketLimits, now: Instant) -> Self {
        Self {
            tokens: limits.capacity,
            last_refill: now,
        }
    }

    /// Add the tokens earned since the last refill, clamped to capacity
    fn refill(&mut self, limits: BucketLimits, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_secs_f64() / 60.0 * limits.rate;
        self.tokens = (self.tokens + earned).min(limits.capacity);
        self.last_refill = now;
    }

    /// Time until one whole token is available
    fn time_to_next_token(&self, limits: BucketLimits) -> Duration {
        let missing = (1.0 - self.tokens).clamp(0.0, 1.0);
        // Round up so the refill after the wait reaches a whole token
        let nanos = (missing * limits.interval.as_secs_f64() * 1e9).ceil();
        Duration::try_from_secs_f64(nanos / 1e9)
            .unwrap_or(limits.interval)
            .max(Duration::from_nanos(1))
    }
}

/// Token bucket rate limiter.
///
/// Each channel refills continuously at `rate` tokens per minute up to its
/// capacity, so callers may burst through a full bucket without waiting. The
/// state lock is released while a caller sleeps for a refill, so a wait on one
/// channel never stalls the other.
#[derive(Debug)]
pub struct TokenBucket {
    limits: ChannelSlots<BucketLimits>,
    state: Mutex<ChannelSlots<BucketState>>,
}

impl TokenBucket {
    /// Create a full bucket from a validated configuration
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;

        let read = BucketLimits::new(config.read_rate, config.read_burst())?;
        let write = config
            .write_rate
            .zip(config.write_burst())
            .map(|(rate, capacity)| BucketLimits::new(rate, capacity))
            .transpose()?;

        let now = Instant::now();
        let state = ChannelSlots::new(
            BucketState::full(read, now),
            write.map(|limits| BucketState::full(limits, now)),
        );

        debug!(
            read_rate = read.rate,
            read_capacity = read.capacity,
            write_rate = ?write.map(|w| w.rate),
            write_capacity = ?write.map(|w| w.capacity),
            "Creating token bucket"
        );

        Ok(Self {
            limits: ChannelSlots::new(read, write),
            state: Mutex::new(state),
        })
    }

    /// Tokens currently available on `channel`, after refilling
    pub async fn available(&self, channel: Channel) -> f64 {
        let limits = *self.limits.get(channel);
        let mut state = self.state.lock().await;
        let bucket = state.get_mut(channel);
        bucket.refill(limits, Instant::now());
        bucket.tokens
    }

    /// Maximum burst on `channel`
    pub fn capacity(&self, channel: Channel) -> f64 {
        self.limits.get(channel).capacity
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self, channel: Channel) {
        let channel = self.limits.resolve(channel);
        let limits = *self.limits.get(channel);
        let mut waited = Duration::ZERO;

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let bucket = state.get_mut(channel);
                bucket.refill(limits, Instant::now());

                if bucket.tokens + TOKEN_EPSILON >= 1.0 {
                    bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                    break;
                }

                bucket.time_to_next_token(limits)
            };

            debug!(
                channel = %channel,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting for token"
            );
            sleep(wait).await;
            waited += wait;
        }

        if !waited.is_zero() {
            debug!(
                channel = %channel,
                waited_ms = waited.as_millis() as u64,
                "Token acquired, proceeding"
            );
            metrics::record_rate_limit_wait(channel, waited);
        }
    }

    fn mode(&self) -> ChannelMode {
        self.limits.mode()
    }

    fn rate(&self, channel: Channel) -> f64 {
        self.limits.get(channel).rate
    }
}
