//! Admission middleware for mutating API routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;

use super::key::client_key;
use crate::ratelimit::{Decision, RateLimiter};

/// Prefix of the API routes gated by default.
pub const DEFAULT_GATED_PREFIX: &str = "/api/";

/// Header carrying the whole tokens left for the caller.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Shared state for [`enforce_rate_limit`].
#[derive(Clone)]
pub struct RateLimitGate {
    pub limiter: Arc<RateLimiter>,
    /// Only paths starting with this prefix are gated
    pub gated_prefix: Arc<str>,
}

impl RateLimitGate {
    /// Create a gate over `limiter` for paths under `gated_prefix`.
    pub fn new(limiter: Arc<RateLimiter>, gated_prefix: &str) -> Self {
        Self {
            limiter,
            gated_prefix: Arc::from(gated_prefix),
        }
    }

    /// Whether a request must pass the limiter.
    ///
    /// Reads are never gated; writes are gated under the prefix.
    pub fn applies_to(&self, method: &Method, path: &str) -> bool {
        let mutating = matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        );
        mutating && path.starts_with(&*self.gated_prefix)
    }
}

/// Body of a rejected request.
#[derive(Debug, Serialize)]
pub struct TooManyRequests {
    pub error: &'static str,
}

/// Build the `429 Too Many Requests` response for a denied decision.
pub fn too_many_requests(decision: &Decision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(TooManyRequests {
            error: "Too many requests",
        }),
    )
        .into_response();
    insert_limit_headers(response.headers_mut(), decision);
    response
}

/// Attach `x-ratelimit-remaining` and, on denial, `retry-after`.
pub fn insert_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    if !decision.ok {
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(decision.reset_in),
        );
    }
}

/// Reject over-limit callers before any handler runs.
///
/// Install with `axum::middleware::from_fn_with_state(gate, enforce_rate_limit)`.
pub async fn enforce_rate_limit(
    State(gate): State<RateLimitGate>,
    request: Request,
    next: Next,
) -> Response {
    if !gate.applies_to(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let key = client_key(request.headers());
    let decision = gate.limiter.check_rate_limit(&key);

    if !decision.ok {
        debug!(
            key = %key,
            method = %request.method(),
            path = %request.uri().path(),
            "Request rejected by rate limiter"
        );
        return too_many_requests(&decision);
    }

    let mut response = next.run(request).await;
    insert_limit_headers(response.headers_mut(), &decision);
    response
}
