//! Token bucket state for a single client key.

use std::time::Instant;

use super::policy::RateLimitPolicy;

/// Per-client rate state.
///
/// `tokens` stays within `[0, capacity]` and `last_refill` never moves
/// backwards, even if the clock does.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Currently available request credits
    tokens: f64,
    /// When `tokens` was last recomputed
    last_refill: Instant,
}

impl Bucket {
    /// Create a bucket holding the full capacity.
    pub fn full(policy: &RateLimitPolicy, now: Instant) -> Self {
        Self {
            tokens: policy.capacity() as f64,
            last_refill: now,
        }
    }

    /// Credit the tokens accrued since the last refill.
    ///
    /// An instant earlier than `last_refill` counts as zero elapsed time.
    pub fn refill(&mut self, policy: &RateLimitPolicy, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let capacity = policy.capacity() as f64;

        self.tokens = (self.tokens + elapsed * policy.refill_rate()).min(capacity);
        self.last_refill = self.last_refill.max(now);
    }

    /// Take one token if a whole one is available.
    ///
    /// Returns `true` if a token was consumed.
    pub fn try_consume(&mut self) -> bool {
        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }

    /// Get the current (possibly fractional) token count.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Get the whole tokens left.
    pub fn whole_tokens(&self) -> u64 {
        self.tokens.floor() as u64
    }

    /// Get the instant of the last refill.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }
}
