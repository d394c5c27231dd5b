//! Error types for chemres-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for chemres operations
pub type Result<T> = std::result::Result<T, ChemResError>;

/// Fatal errors for a whole `resolve` or `enrich` call.
///
/// Anything scoped to a single identifier or batch is reported through
/// `DiagnosticsReport` instead.
#[derive(Error, Debug)]
pub enum ChemResError {
    /// The lookup service could not be contacted at all
    #[error("Lookup service unreachable: {0}")]
    ServiceUnreachable(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Async runtime could not be started for a blocking call
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Failure of one lookup or one enrichment batch, after retries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Transport or service failure that survived the retry budget
    #[error("Service error after {attempts} attempt(s): {message}")]
    Service { message: String, attempts: u32 },

    /// The service answered but the body could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Every attempt failed to connect and the service has never answered
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    /// The caller's cancellation token fired
    #[error("Cancelled")]
    Cancelled,
}

impl LookupError {
    /// Whether this failure should abort the whole operation
    pub fn is_fatal(&self) -> bool {
        matches!(self, LookupError::Unreachable(_))
    }
}

impl From<std::io::Error> for ChemResError {
    fn from(err: std::io::Error) -> Self {
        ChemResError::Runtime(err.to_string())
    }
}
