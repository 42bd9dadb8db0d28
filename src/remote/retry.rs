//! Retry policy for remote calls.

use std::time::Duration;

/// Default number of attempts per call
pub const DEFAULT_RETRIES: u32 = 3;

/// Default base backoff
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Exponential backoff: attempt `n` (0-based) waits `backoff * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self {
            retries: retries.max(1),
            backoff,
        }
    }

    /// Wait before the attempt that follows `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }

    /// Whether another attempt may follow `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_BACKOFF)
    }
}
