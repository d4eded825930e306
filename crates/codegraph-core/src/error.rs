//! Crate-wide error taxonomy (kinds only — no implementation detail leaks
//! across the two transport boundaries). Every variant here corresponds
//! to a row of the error-handling design: per-file and per-edge failures
//! are always local and never bubble up as this error type (they're
//! recorded at debug level and produce a degraded fragment instead);
//! this type is for failures a caller actually needs to react to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeGraphError {
    #[error("unsupported language for {0}")]
    UnsupportedLanguage(String),

    #[error("parse error in {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("node or symbol not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CodeGraphError {
    /// Stable machine-readable tag, used by transports to pick an HTTP
    /// status / MCP error code without matching on the Display string.
    pub fn kind(&self) -> &'static str {
        match self {
            CodeGraphError::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            CodeGraphError::ParseError { .. } => "PARSE_ERROR",
            CodeGraphError::NotFound(_) => "NOT_FOUND",
            CodeGraphError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            CodeGraphError::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            CodeGraphError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            CodeGraphError::Internal(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, CodeGraphError>;
