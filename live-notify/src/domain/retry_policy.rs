//! Backoff policy for failed poll cycles.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum exponent to prevent overflow.
const MAX_EXPONENT: u32 = 20;

/// Retry policy applied between consecutive failed cycles.
///
/// The delay before retry `n` (1-based) is `min(base * 2^(n-1), max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Consecutive failures tolerated before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Whether to add up to 25% random jitter to delays.
    #[serde(default)]
    pub use_jitter: bool,
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            use_jitter: false,
        }
    }

    /// Delay to wait after the `retry_count`-th consecutive failure.
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(MAX_EXPONENT);
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);

        if self.use_jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay + Duration::from_millis(jitter_ms)
        } else {
            delay
        }
    }

    /// Whether `consecutive_failures` has reached the retry ceiling.
    pub fn is_exhausted(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.max_retries
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60), Duration::from_secs(300))
    }
}
