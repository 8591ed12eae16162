//! Bounded exponential backoff around store calls.
//!
//! Every remote call goes through [`RetryGate::execute`]. Rate-limit and quota
//! rejections are retried after `min(base * 2^attempt + jitter, cap)`; anything
//! else is returned to the caller on the first failure.
use crate::config::Config;
use crate::error::SheetQueryError;
use crate::store::StoreError;
use rand::Rng;
use std::time::Duration;

/// Returns whether a store error message signals rate limiting or quota exhaustion.
pub fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("429") || message.contains("quota exceeded") || message.contains("rate limit exceeded")
}

/// Returns whether a store error should be retried.
pub fn is_rate_limited(error: &StoreError) -> bool {
    matches!(error, StoreError::RateLimited(_)) || is_rate_limit_message(&error.to_string())
}

/// Backoff before retry number `attempt` (1-based), jitter excluded from the exponent.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration, jitter: Duration) -> Duration {
    let exp = 1u64 << attempt.min(32);
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
    let delay = Duration::from_millis(base_ms.saturating_mul(exp).saturating_add(jitter_ms));
    delay.min(cap)
}

/// Retries rate-limited store calls with capped exponential backoff.
#[derive(Clone, Debug)]
pub struct RetryGate {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
    sleep: fn(Duration),
}

impl Default for RetryGate {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RetryGate {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration, jitter: Duration) -> Self {
        RetryGate {
            max_retries,
            base_delay,
            max_delay,
            jitter,
            sleep: std::thread::sleep,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Replaces the blocking sleep, e.g. with a no-op in tests.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `attempt`, with a uniformly random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = match jitter_ms {
            0 => Duration::ZERO,
            upper => Duration::from_millis(rand::thread_rng().gen_range(0..=upper)),
        };
        backoff_delay(attempt, self.base_delay, self.max_delay, jitter)
    }

    /// Runs one store call, sleeping and retrying while it is rate limited.
    ///
    /// At most `max_retries` calls are made; when all are rate limited the last
    /// store message is returned inside [`SheetQueryError::RetryExhausted`].
    pub fn execute<T, F>(&self, label: &str, mut operation: F) -> Result<T, SheetQueryError>
    where
        F: FnMut() -> Result<T, StoreError>,
    {
        let mut attempt = 0u32;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if is_rate_limited(&error) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        tracing::warn!(call = label, retries = self.max_retries, %error, "giving up after rate limiting");
                        return Err(SheetQueryError::RetryExhausted {
                            retries: self.max_retries,
                            message: error.to_string(),
                        });
                    }
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "store call rate limited; backing off"
                    );
                    (self.sleep)(delay);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
