//! HTTP server exposing the limiter to out-of-process callers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::key::client_key;
use super::middleware::insert_limit_headers;
use crate::error::{EchoLimiterError, Result};
use crate::ratelimit::RateLimiter;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of client keys with a bucket
    pub buckets: usize,
}

/// Admission check request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Client key; derived from the request headers when absent or empty
    #[serde(default)]
    pub key: Option<String>,
}

/// Creates the router for the admission service.
pub fn create_router(limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/check", post(check_handler))
        .with_state(limiter)
}

async fn health_handler(State(limiter): State<Arc<RateLimiter>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        buckets: limiter.bucket_count(),
    })
}

/// Run one admission check; 200 when admitted, 429 when denied.
///
/// The JSON body is optional; without one the key comes from the headers.
async fn check_handler(
    State(limiter): State<Arc<RateLimiter>>,
    headers: HeaderMap,
    request: Option<Json<CheckRequest>>,
) -> Response {
    let key = request
        .and_then(|Json(request)| request.key)
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| client_key(&headers));

    let decision = limiter.check_rate_limit(&key);

    debug!(
        key = %key,
        ok = decision.ok,
        remaining = decision.remaining,
        "Admission check"
    );

    let status = if decision.ok {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };
    let mut response = (status, Json(decision)).into_response();
    insert_limit_headers(response.headers_mut(), &decision);
    response
}

/// HTTP server for the admission service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server around a rate limiter.
    pub fn new(addr: SocketAddr, rate_limiter: Arc<RateLimiter>) -> Self {
        Self { addr, rate_limiter }
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!(
            addr = %self.addr,
            "Starting HTTP admission service with graceful shutdown"
        );

        axum::serve(listener, create_router(self.rate_limiter))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                EchoLimiterError::Io(e)
            })
    }
}
