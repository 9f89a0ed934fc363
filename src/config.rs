//! Configuration management for the limiter service.

use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

use crate::error::{EchoLimiterError, Result};
use crate::ratelimit::{RateLimitPolicy, DEFAULT_CAPACITY, DEFAULT_WINDOW_SECS};

/// Prefix of the environment variables that override rate limit settings.
///
/// `RATE_LIMIT_WINDOW` and `RATE_LIMIT_POINTS` are recognized.
pub const ENV_PREFIX: &str = "RATE_LIMIT";

/// Main configuration for the limiter service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoLimiterConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Seconds over which an empty bucket refills completely
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Bucket capacity, the maximum burst per client
    #[serde(default = "default_max_points")]
    pub max_points: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_points: default_max_points(),
        }
    }
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_max_points() -> u64 {
    DEFAULT_CAPACITY
}

impl RateLimitingConfig {
    /// Build the validated policy for these settings.
    pub fn policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(self.window_secs, self.max_points)
    }

    /// Apply `RATE_LIMIT_WINDOW` / `RATE_LIMIT_POINTS` from `environment`.
    ///
    /// Unset or empty variables keep the current value.
    fn with_overrides_from(self, environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("window", self.window_secs)?
            .set_default("points", self.max_points)?
            .add_source(environment.try_parsing(true).ignore_empty(true))
            .build()?;

        Ok(Self {
            window_secs: settings.get("window")?,
            max_points: settings.get("points")?,
        })
    }
}

impl EchoLimiterConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| EchoLimiterError::Config(e.to_string()))
    }

    /// Load the startup configuration.
    ///
    /// Reads the file if one is given (defaults otherwise), then applies
    /// environment overrides and validates the rate limit settings.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&str>, environment: Environment) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path, "Loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        config.rate_limiting = config.rate_limiting.with_overrides_from(environment)?;
        config.rate_limiting.policy()?;
        Ok(config)
    }
}
