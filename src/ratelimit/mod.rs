//! Rate limiting logic and state management.

mod bucket;
mod clock;
mod limiter;
mod policy;

pub use bucket::Bucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{Decision, RateLimiter};
pub use policy::{RateLimitPolicy, DEFAULT_CAPACITY, DEFAULT_WINDOW_SECS};
