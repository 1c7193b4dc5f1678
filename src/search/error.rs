//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while indexing or querying
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// URL segment or name that maps to no index type
    #[error("Unknown index type: {0}")]
    UnknownIndexType(String),

    /// Engine could not be reached or timed out
    #[error("Search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Engine answered with an error status
    #[error("Search engine rejected request ({status}): {message}")]
    EngineRejected { status: u16, message: String },

    /// Engine payload could not be decoded
    #[error("Invalid search engine response: {0}")]
    InvalidResponse(String),

    /// Relational source failure
    #[error("Record source error: {0}")]
    Source(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SearchError {
    /// Whether the failure may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::EngineUnavailable(_) => true,
            SearchError::EngineRejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short variant name used in task failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::UnknownIndexType(_) => "UnknownIndexType",
            SearchError::EngineUnavailable(_) => "EngineUnavailable",
            SearchError::EngineRejected { .. } => "EngineRejected",
            SearchError::InvalidResponse(_) => "InvalidResponse",
            SearchError::Source(_) => "SourceError",
            SearchError::Serialization(_) => "SerializationError",
            SearchError::IoError(_) => "IoError",
            SearchError::InvalidConfiguration(_) => "InvalidConfiguration",
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SearchError::EngineRejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SearchError::EngineUnavailable(err.to_string())
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::UnknownIndexType(segment) => {
                AppError::NotFound(format!("Unknown index type: {}", segment))
            }
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::IoError(err) => AppError::Io(err),
            SearchError::Source(msg) => AppError::Source(msg),
            SearchError::Serialization(err) => AppError::Serialization(err.to_string()),
            err @ (SearchError::EngineUnavailable(_)
            | SearchError::EngineRejected { .. }
            | SearchError::InvalidResponse(_)) => AppError::Engine(err.to_string()),
        }
    }
}
