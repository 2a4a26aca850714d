use super::types::{
    interval_for, Channel, ChannelMode, ChannelSlots, RateLimitConfig, RateLimiter,
};
use crate::error::Result;
use crate::metrics;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Pace {
    /// Calls per minute
    rate: f64,
    /// Minimum spacing between two calls
    interval: Duration,
}

impl Pace {
    fn new(rate: f64) -> Result<Self> {
        Ok(Self {
            rate,
            interval: interval_for(rate)?,
        })
    }
}

/// Leaky bucket rate limiter.
///
/// Enforces a fixed pace per channel: with a rate of 600/min calls are spaced
/// at least 100ms apart and no burst is ever allowed. Each caller reserves the
/// next free slot under the lock and then sleeps until that slot outside of it,
/// so concurrent callers queue up behind each other without holding the lock.
#[derive(Debug)]
pub struct LeakyBucket {
    pace: ChannelSlots<Pace>,
    last_call: Mutex<ChannelSlots<Option<Instant>>>,
}

impl LeakyBucket {
    /// Create a leaky bucket; capacities in `config` are ignored
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;

        let read = Pace::new(config.read_rate)?;
        let write = config.write_rate.map(Pace::new).transpose()?;

        debug!(
            read_interval_ms = read.interval.as_millis() as u64,
            write_interval_ms = ?write.map(|w| w.interval.as_millis() as u64),
            "Creating leaky bucket"
        );

        Ok(Self {
            pace: ChannelSlots::new(read, write),
            last_call: Mutex::new(ChannelSlots::new(None, write.map(|_| None))),
        })
    }

    /// Minimum spacing between calls on `channel`
    pub fn interval(&self, channel: Channel) -> Duration {
        self.pace.get(channel).interval
    }

    /// Reserve the next slot on `channel` and return the instant it opens
    async fn reserve(&self, channel: Channel) -> Instant {
        let interval = self.interval(channel);
        let mut last_call = self.last_call.lock().await;
        let now = Instant::now();

        let slot = match *last_call.get(channel) {
            Some(previous) => (previous + interval).max(now),
            None => now,
        };
        *last_call.get_mut(channel) = Some(slot);
        slot
    }
}

#[async_trait]
impl RateLimiter for LeakyBucket {
    async fn acquire(&self, channel: Channel) {
        let channel = self.pace.resolve(channel);
        let slot = self.reserve(channel).await;
        let now = Instant::now();

        if slot > now {
            let wait = slot - now;
            debug!(
                channel = %channel,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting for slot"
            );
            sleep_until(slot).await;
            debug!(channel = %channel, "Slot open, proceeding");
            metrics::record_rate_limit_wait(channel, wait);
        }
    }

    fn mode(&self) -> ChannelMode {
        self.pace.mode()
    }

    fn rate(&self, channel: Channel) -> f64 {
        self.pace.get(channel).rate
    }
}
