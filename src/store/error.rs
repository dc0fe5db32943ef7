//! Errors reported by an object store.

use crate::object::ObjectKey;
use thiserror::Error;

/// StoreError represents a failed read or write against an [`ObjectStore`](super::ObjectStore).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{key}: not found")]
    NotFound { key: ObjectKey },

    #[error("{key}: already exists")]
    AlreadyExists { key: ObjectKey },

    /// The write carried a resource version other than the stored one. Retry
    /// with a fresh read.
    #[error("{key}: conflict: resourceVersion {given} is stale, current is {current}")]
    Conflict {
        key: ObjectKey,
        given: String,
        current: String,
    },

    #[error("invalid: {message}")]
    Invalid { message: String },
}

impl StoreError {
    pub fn not_found(key: &ObjectKey) -> Self {
        StoreError::NotFound { key: key.clone() }
    }

    pub fn already_exists(key: &ObjectKey) -> Self {
        StoreError::AlreadyExists { key: key.clone() }
    }

    pub fn conflict(key: &ObjectKey, given: impl Into<String>, current: impl Into<String>) -> Self {
        StoreError::Conflict {
            key: key.clone(),
            given: given.into(),
            current: current.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::Invalid {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<crate::error::Error> for StoreError {
    fn from(err: crate::error::Error) -> Self {
        StoreError::invalid(err.to_string())
    }
}
