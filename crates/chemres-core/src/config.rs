//! Configuration for chemres-core
//!
//! Every tunable of the resolution engine lives here and is passed in at
//! construction: service endpoint, rate limiting, retry budget, concurrency
//! bounds and batch size.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of CIDs the property endpoint accepts per request in practice
pub const MAX_BATCH: usize = 100;

/// Default PUG REST root
pub const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Top-level resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// External service endpoint settings
    pub service: ServiceConfig,
    /// Call spacing and retry budget
    pub rate_limit: RateLimitConfig,
    /// Identifier resolution settings
    pub resolution: ResolutionConfig,
    /// Batch enrichment settings
    pub enrichment: EnrichmentConfig,
    /// Keep successful lookups in memory for the resolver's lifetime
    pub memoize: bool,
}

/// External service endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// PUG REST root URL
    pub base_url: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("chemres/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_ms: 30_000,
        }
    }
}

/// Rate limiting and retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum spacing between the start of two calls, in milliseconds
    pub min_interval_ms: u64,
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled on each further retry
    pub initial_backoff_ms: u64,
    /// Cap on any single backoff wait
    pub max_backoff_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // PubChem asks for no more than 5 requests per second
            min_interval_ms: 200,
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// Identifier resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Identifiers resolved concurrently
    pub concurrency: usize,
    /// Try less specific compatible strategies when the primary finds nothing
    pub fallback: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fallback: true,
        }
    }
}

/// Batch enrichment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// CIDs per property request
    pub batch_size: usize,
    /// Batch requests in flight at once
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH,
            concurrency: 4,
        }
    }
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ResolverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    #[cfg(feature = "toml-config")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    #[cfg(feature = "toml-config")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.service.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.service.base_url, e)))?;

        if self.service.request_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "request_timeout_ms must be positive".to_string(),
            ));
        }

        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::OutOfRange(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.initial_backoff_ms > self.rate_limit.max_backoff_ms {
            return Err(ConfigError::OutOfRange(
                "initial_backoff_ms must not exceed max_backoff_ms".to_string(),
            ));
        }

        if self.resolution.concurrency == 0 || self.enrichment.concurrency == 0 {
            return Err(ConfigError::OutOfRange(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.enrichment.batch_size == 0 || self.enrichment.batch_size > MAX_BATCH {
            return Err(ConfigError::OutOfRange(format!(
                "batch_size must be between 1 and {}",
                MAX_BATCH
            )));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Service URL does not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
