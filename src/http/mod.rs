//! HTTP adapters: client key derivation, the 429 gate, and the admission service.

pub mod key;
mod middleware;
mod server;

pub use key::{client_key, ANONYMOUS_KEY};
pub use middleware::{
    enforce_rate_limit, insert_limit_headers, too_many_requests, RateLimitGate, TooManyRequests,
    DEFAULT_GATED_PREFIX, REMAINING_HEADER,
};
pub use server::{create_router, CheckRequest, HealthResponse, HttpServer};
