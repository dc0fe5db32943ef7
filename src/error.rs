//! Error types shared by the merge engine and the reconciliation layer.

use crate::fieldpath::Path;
use crate::store::StoreError;
use thiserror::Error;

/// Error represents a failure anywhere in decoding, merging, comparing or
/// reconciling documents. Any error invalidates the whole operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: unsupported type: {found}")]
    UnsupportedType { path: String, found: String },

    #[error("{path}: type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("invalid object: {message}")]
    InvalidObject { message: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{} of {total} objects failed: {}", .failures.len(), .failures.join("; "))]
    Batch { total: usize, failures: Vec<String> },
}

impl Error {
    /// Creates an unsupported type error.
    pub fn unsupported_type(path: &Path, found: impl Into<String>) -> Self {
        Error::UnsupportedType {
            path: path.to_string(),
            found: found.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(path: &Path, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid object error.
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Error::InvalidObject {
            message: message.into(),
        }
    }

    /// Returns true if retrying with a fresh read of the object may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Store(StoreError::Conflict { .. }))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
