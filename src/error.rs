//! Error types for the Echo Post rate limiter.

use thiserror::Error;

/// Main error type for limiter setup and serving.
///
/// Denying a request is not an error; see [`crate::ratelimit::Decision`].
#[derive(Error, Debug)]
pub enum EchoLimiterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for EchoLimiterError {
    fn from(err: config::ConfigError) -> Self {
        EchoLimiterError::Config(err.to_string())
    }
}

/// Result type alias for limiter operations.
pub type Result<T> = std::result::Result<T, EchoLimiterError>;
