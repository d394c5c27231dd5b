//! Errors shared by source plugins

use crate::error::LookupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The service knows nothing about the requested identifier
    NotFound,
    /// Response body could not be decoded
    Parse(String),
    /// Non-success status that is neither "not found" nor retryable
    Status { status: u16, message: String },
    /// Request could not be built for this input
    InvalidQuery(String),
}

impl From<SourceError> for LookupError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound => LookupError::Malformed("unexpected not-found".to_string()),
            SourceError::Parse(message) => LookupError::Malformed(message),
            SourceError::Status { status, message } => LookupError::Service {
                message: format!("HTTP {}: {}", status, message),
                attempts: 1,
            },
            SourceError::InvalidQuery(message) => LookupError::Service {
                message: format!("Invalid query: {}", message),
                attempts: 0,
            },
        }
    }
}
