//! Retry policy for conflicted transactions.
//!
//! The concurrency core has no notion of retrying: a conflict rolls the
//! transaction back and that is the end of it. Retrying is this layer's
//! job, parameterized by attempt count with capped exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Backoff policy applied between conflicted attempts.
///
/// Delay for attempt `n` (0-based) is `base_delay_ms * 2^n`, capped at
/// `max_delay_ms`. With jitter enabled the delay is scaled by a random
/// factor in `[0.5, 1.0]` so colliding transactions spread out instead of
/// re-colliding in lockstep.
///
/// # Example
///
/// ```ignore
/// use versadb::RetryConfig;
///
/// let patient = RetryConfig {
///     max_retries: 10,
///     base_delay_ms: 5,
///     max_delay_ms: 500,
///     jitter: true,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Ceiling for the exponential growth.
    pub max_delay_ms: u64,
    /// Randomize each delay to avoid synchronized retry storms.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries: one attempt, conflicts surface immediately.
    pub fn none() -> Self {
        RetryConfig {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// How long to back off after a conflicted attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // shift capped so the multiplier cannot overflow u64
        let factor = 1u64 << attempt.min(20);
        let capped = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        let millis = if self.jitter && capped > 0 {
            let scale = rand::thread_rng().gen_range(0.5..=1.0);
            (capped as f64 * scale) as u64
        } else {
            capped
        };
        Duration::from_millis(millis)
    }
}
