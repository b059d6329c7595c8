//! Error types for the lexlink library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`LexlinkError`] enum. The variants follow the failure classes of the
//! scoring and linking pipeline:
//!
//! - [`LexlinkError::Configuration`] is raised before any scoring starts
//!   (missing smoothing parameter, unknown model name, ...).
//! - [`LexlinkError::Collaborator`] wraps failures reaching the text-search
//!   service or the document store. They are propagated, never retried.
//! - [`LexlinkError::Model`] covers the learned ranker artifact.
//!
//! Missing statistics are not errors (they resolve to zero), and a document
//! that cannot be scored is reported as `None` by the scorers.
//!
//! # Examples
//!
//! ```
//! use lexlink::error::{LexlinkError, Result};
//!
//! fn check_lambda(lambda: f64) -> Result<()> {
//!     if lambda <= 0.0 || lambda >= 1.0 {
//!         return Err(LexlinkError::config("lambda must lie in (0, 1)"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_lambda(0.1).is_ok());
//! assert!(check_lambda(1.5).is_err());
//! ```

use std::io;

use thiserror::Error;

use crate::ml::MlError;

/// The main error type for lexlink operations.
#[derive(Error, Debug)]
pub enum LexlinkError {
    /// I/O errors (reading config, query, model or data files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or incomplete configuration; fatal before scoring begins.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The text-search service or document store could not be reached.
    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    /// Learned ranker errors (artifact loading, feature vocabulary).
    #[error("Model error: {0}")]
    Model(#[from] MlError),

    /// Query-related errors.
    #[error("Query error: {0}")]
    Query(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with LexlinkError.
pub type Result<T> = std::result::Result<T, LexlinkError>;

impl LexlinkError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LexlinkError::Configuration(msg.into())
    }

    /// Create a new collaborator error.
    pub fn collaborator<S: Into<String>>(msg: S) -> Self {
        LexlinkError::Collaborator(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        LexlinkError::Query(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LexlinkError::Other(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        LexlinkError::Other(format!("Not found: {}", msg.into()))
    }

    /// Whether this error should stop a run before any scoring happens.
    ///
    /// Ranker artifact and feature vocabulary problems count as
    /// configuration failures.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, LexlinkError::Configuration(_) | LexlinkError::Model(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = LexlinkError::config("missing smoothing_param");
        assert_eq!(
            error.to_string(),
            "Configuration error: missing smoothing_param"
        );
        assert!(error.is_fatal_config());

        let error = LexlinkError::collaborator("connection refused");
        assert_eq!(
            error.to_string(),
            "Collaborator unavailable: connection refused"
        );
        assert!(!error.is_fatal_config());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let lexlink_error = LexlinkError::from(io_error);

        match lexlink_error {
            LexlinkError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_model_error_conversion() {
        let err: LexlinkError = MlError::HeterogeneousFeatures {
            instance_id: "q1-e1".to_string(),
        }
        .into();
        assert!(matches!(err, LexlinkError::Model(_)));
        assert!(err.is_fatal_config());
    }
}
