//! HTTP transport abstraction and the rate-limited client built on it

#[cfg(feature = "native")]
pub mod native;
pub mod rate_limit;

#[cfg(feature = "native")]
pub use native::*;
pub use rate_limit::{RateLimitedClient, RetryPolicy};

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Connection failed: {message}")]
    Connect { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Timeout")]
    Timeout,
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

impl HttpError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, HttpError::InvalidUrl { .. })
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Throttling or any server-side (5xx) failure
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }

    /// `Retry-After` in delay-seconds form
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// A way to issue GET requests.
///
/// The production implementation is `HttpClient` (reqwest); tests script
/// responses in memory.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}
