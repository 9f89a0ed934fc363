//! Echo Post rate limiter
//!
//! Per-client admission control for the Echo Post API. Each client key
//! (normally the caller's IP address) owns a token bucket that refills
//! continuously; every mutating request consumes one token and is rejected
//! with `429 Too Many Requests` when the bucket is empty.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
