//! Core rate limiter implementation.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::bucket::Bucket;
use super::clock::{Clock, SystemClock};
use super::policy::RateLimitPolicy;

/// The outcome of a single admission check.
///
/// A denial is an ordinary value, not an error: callers branch on `ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the request was admitted and a token consumed
    pub ok: bool,
    /// Whole tokens left after this decision (0 if denied)
    pub remaining: u64,
    /// The configured refill window in seconds
    pub reset_in: u64,
}

/// The process-wide rate limiter.
///
/// Holds one token bucket per client key. The struct is thread-safe and
/// meant to be constructed once and shared behind an `Arc`.
pub struct RateLimiter {
    /// Token buckets indexed by client key
    buckets: DashMap<String, Bucket>,
    /// Limit applied to every key
    policy: RateLimitPolicy,
    /// Source of "now" for refill
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter reading the system clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a new rate limiter with a custom clock.
    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            policy,
            clock,
        }
    }

    /// Check and consume one request credit for `key`.
    ///
    /// The bucket is created full on first use. Refill, comparison and
    /// consumption happen under the entry's write guard, so concurrent
    /// checks for the same key never admit more than the bucket holds.
    pub fn check_rate_limit(&self, key: &str) -> Decision {
        let now = self.clock.now();

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            trace!(
                key = %key,
                capacity = self.policy.capacity(),
                window_secs = self.policy.window_secs(),
                "Creating new token bucket"
            );
            Bucket::full(&self.policy, now)
        });

        bucket.refill(&self.policy, now);

        let ok = bucket.try_consume();
        let remaining = if ok { bucket.whole_tokens() } else { 0 };

        Decision {
            ok,
            remaining,
            reset_in: self.policy.window_secs(),
        }
    }

    /// Get the stored token count for a key, without refilling.
    ///
    /// Returns `None` if the key has never been checked.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.tokens())
    }

    /// Get the policy applied to every key.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Clear all buckets.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Get the number of tracked keys.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn limiter(window_secs: u64, capacity: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = RateLimitPolicy::new(window_secs, capacity).unwrap();
        (RateLimiter::with_clock(policy, clock.clone()), clock)
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.bucket_count(), 0);
        assert_eq!(limiter.policy().capacity(), 120);
    }

    #[test]
    fn test_first_check_consumes_one_token() {
        let (limiter, _clock) = limiter(60, 5);

        let decision = limiter.check_rate_limit("10.0.0.1");

        assert!(decision.ok);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.reset_in, 60);
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn test_burst_is_bounded_by_capacity() {
        let (limiter, _clock) = limiter(60, 5);

        for i in 1..=5 {
            let decision = limiter.check_rate_limit("10.0.0.1");
            assert!(decision.ok, "Request {} should be admitted", i);
        }

        // 6th immediate request is over the limit
        let decision = limiter.check_rate_limit("10.0.0.1");
        assert_eq!(
            decision,
            Decision {
                ok: false,
                remaining: 0,
                reset_in: 60
            }
        );
    }

    #[test]
    fn test_refill_after_full_window() {
        let (limiter, clock) = limiter(60, 5);
        while limiter.check_rate_limit("ip").ok {}

        clock.advance(Duration::from_secs(60));

        let decision = limiter.check_rate_limit("ip");
        assert!(decision.ok);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let (limiter, clock) = limiter(60, 5);
        limiter.check_rate_limit("ip");

        clock.advance(Duration::from_secs(10 * 60));
        limiter.check_rate_limit("ip");

        let tokens = limiter.tokens("ip").unwrap();
        assert!((0.0..=5.0).contains(&tokens));
        assert_eq!(tokens, 4.0);
    }

    #[test]
    fn test_partial_refill_is_proportional() {
        let (limiter, clock) = limiter(60, 10);
        while limiter.check_rate_limit("ip").ok {}
        assert_eq!(limiter.tokens("ip"), Some(0.0));

        clock.advance(Duration::from_secs(30));

        // Half a window restores half the capacity; one is consumed
        let decision = limiter.check_rate_limit("ip");
        assert!(decision.ok);
        assert_eq!(decision.remaining, 4);
        let tokens = limiter.tokens("ip").unwrap();
        assert!((tokens - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_keys_are_isolated() {
        let (limiter, _clock) = limiter(60, 2);
        while limiter.check_rate_limit("a").ok {}

        let decision = limiter.check_rate_limit("b");
        assert!(decision.ok);
        assert_eq!(decision.remaining, 1);
        assert!(!limiter.check_rate_limit("a").ok);
    }

    #[test]
    fn test_denial_still_updates_refill_time() {
        let (limiter, clock) = limiter(60, 3);
        while limiter.check_rate_limit("ip").ok {}

        // 10s accrues half a token; the denied call banks it
        clock.advance(Duration::from_secs(10));
        assert!(!limiter.check_rate_limit("ip").ok);
        assert!((limiter.tokens("ip").unwrap() - 0.5).abs() < 1e-9);

        clock.advance(Duration::from_secs(10));
        assert!(limiter.check_rate_limit("ip").ok);
    }

    #[test]
    fn test_backward_clock_does_not_refill() {
        let (limiter, clock) = limiter(60, 3);
        clock.advance(Duration::from_secs(120));
        while limiter.check_rate_limit("ip").ok {}

        clock.rewind(Duration::from_secs(60));
        assert!(!limiter.check_rate_limit("ip").ok);

        // Back at the instant the bucket was drained; nothing has elapsed
        clock.advance(Duration::from_secs(60));
        assert!(!limiter.check_rate_limit("ip").ok);
        assert_eq!(limiter.tokens("ip"), Some(0.0));
    }

    #[test]
    fn test_example_scenario() {
        let (limiter, clock) = limiter(60, 3);

        let remaining: Vec<u64> = (0..3)
            .map(|_| {
                let decision = limiter.check_rate_limit("ip1");
                assert!(decision.ok);
                decision.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let denied = limiter.check_rate_limit("ip1");
        assert_eq!(
            denied,
            Decision {
                ok: false,
                remaining: 0,
                reset_in: 60
            }
        );

        let other = limiter.check_rate_limit("ip2");
        assert!(other.ok);
        assert_eq!(other.remaining, 2);

        // 3 / 60 tokens per second over 20 seconds is one token
        clock.advance(Duration::from_secs(20));
        let decision = limiter.check_rate_limit("ip1");
        assert!(decision.ok);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_capacity() {
        let (limiter, _clock) = limiter(60, 10);
        let threads = 32;
        let barrier = Barrier::new(threads);
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    barrier.wait();
                    if limiter.check_rate_limit("shared").ok {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn test_clear_buckets() {
        let (limiter, _clock) = limiter(60, 3);
        limiter.check_rate_limit("a");
        limiter.check_rate_limit("b");
        assert_eq!(limiter.bucket_count(), 2);

        limiter.clear();
        assert_eq!(limiter.bucket_count(), 0);
        assert_eq!(limiter.tokens("a"), None);
    }

    #[test]
    fn test_decision_serializes_camel_case() {
        let decision = Decision {
            ok: false,
            remaining: 0,
            reset_in: 60,
        };
        let json = serde_json::to_value(decision).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": false, "remaining": 0, "resetIn": 60})
        );
    }
}
