//! Client key derivation from request headers.

use axum::http::HeaderMap;

/// Key shared by every caller without an identifiable address.
pub const ANONYMOUS_KEY: &str = "anon";

/// Derive the rate limit key for a request.
///
/// Order: first address in `x-forwarded-for`, then `x-real-ip`, then
/// [`ANONYMOUS_KEY`]. Blank or non-ASCII header values are skipped.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(ANONYMOUS_KEY)
        .to_string()
}
