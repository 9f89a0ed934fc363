//! Rate limit policy shared by every bucket.

use crate::error::{EchoLimiterError, Result};

/// Default refill window in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;
/// Default bucket capacity (maximum burst).
pub const DEFAULT_CAPACITY: u64 = 120;

/// The limit applied to every client key.
///
/// A bucket holds at most `capacity` tokens and regains all of them over
/// `window_secs` seconds, continuously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    window_secs: u64,
    capacity: u64,
}

impl RateLimitPolicy {
    /// Create a validated policy.
    ///
    /// Both the window and the capacity must be non-zero.
    pub fn new(window_secs: u64, capacity: u64) -> Result<Self> {
        if window_secs == 0 {
            return Err(EchoLimiterError::Config(
                "rate limit window must be at least one second".to_string(),
            ));
        }
        if capacity == 0 {
            return Err(EchoLimiterError::Config(
                "rate limit capacity must be at least one point".to_string(),
            ));
        }
        Ok(Self {
            window_secs,
            capacity,
        })
    }

    /// Seconds over which an empty bucket refills completely.
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Maximum number of tokens a bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Tokens regained per second.
    pub fn refill_rate(&self) -> f64 {
        self.capacity as f64 / self.window_secs as f64
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}
