//! Error types for docanchor library.

use std::io;
use thiserror::Error;

/// Result type alias for docanchor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur outside the always-succeed entry points.
///
/// `StructureAnalyzer::analyze`, `ResponseParser::parse` and
/// `ResponseParser::parse_with_fallback` never return these; they fold
/// failures into degraded results instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading schema or document files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No schema is registered under the given name.
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// The schema document exists but is malformed.
    #[error("Invalid schema '{name}': {reason}")]
    InvalidSchema {
        /// Schema name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Input has the wrong shape (empty document, too many elements).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Text could not be turned into JSON, even after repair.
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Unexpected internal fault.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an `InvalidSchema` error.
    pub fn invalid_schema(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSchema {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Convert a caught panic payload into an `Internal` error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Error::Internal(message)
    }
}
