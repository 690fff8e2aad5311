//! Custom error types for the footprint search engine.
//!
//! Only conditions that stop a search before or instead of producing a
//! profile live here. Per-source failures never become a `FootprintError`;
//! they are folded into `found: false` source results (see `models::ProbeFailure`).

use std::path::PathBuf;

/// The main error type for footprint operations.
#[derive(Debug, thiserror::Error)]
pub enum FootprintError {
    /// Query rejected before any probe was dispatched
    #[error("Invalid {kind} query '{value}': {reason}")]
    InvalidQuery {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// The search was cancelled; no partial profile is produced
    #[error("Search cancelled before all probes completed")]
    Cancelled,

    /// Platform catalog could not be loaded or is malformed
    #[error("Platform catalog error at {path:?}: {message}")]
    Catalog {
        path: Option<PathBuf>,
        message: String,
    },

    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (report writing, catalog reading)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using FootprintError
pub type FootprintResult<T> = Result<T, FootprintError>;

impl FootprintError {
    /// Create an invalid-query error
    pub fn invalid_query(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidQuery {
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a catalog error with optional path context
    pub fn catalog(message: impl Into<String>, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Catalog {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for FootprintError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
