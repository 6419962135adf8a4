//! Error types for the Precedente pattern store
//!
//! This module provides structured error handling using thiserror. Errors are
//! always surfaced to the caller; the store never retries a failed write on
//! its own, since retrying a divergence insert could double-count toward
//! deprecation.

use thiserror::Error;

/// Main error type for Precedente operations
#[derive(Error, Debug)]
pub enum PrecedenteError {
    /// Malformed input value object (out-of-range confidence, bad vector
    /// length, invalid bbox). Raised at construction time, before any store
    /// interaction.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Programming error in how an operation was invoked, e.g. comparing
    /// vectors of different lengths.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced caso does not exist
    #[error("Caso not found: {0}")]
    CasoNotFound(i64),

    /// Referenced pattern does not exist
    #[error("Pattern not found: {0}")]
    PatternNotFound(i64),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool failure (checkout or interact)
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Precedente operations
pub type Result<T> = std::result::Result<T, PrecedenteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrecedenteError::CasoNotFound(42);
        assert_eq!(err.to_string(), "Caso not found: 42");

        let err = PrecedenteError::Validation("confidence out of range".to_string());
        assert_eq!(err.to_string(), "Validation error: confidence out of range");
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let sqlite_err = rusqlite::Error::QueryReturnedNoRows;
        let err: PrecedenteError = sqlite_err.into();
        assert!(matches!(err, PrecedenteError::Database(_)));
    }
}
