//! Error types for domain-level operations.

use thiserror::Error;

/// Errors raised while building or decoding conversation state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The key is readonly and cannot take new values.
    #[error("state key is readonly: {0}")]
    Readonly(String),

    /// A stored value could not be decoded as its declared data type.
    #[error("cannot decode {data_type} value: {message}")]
    Decode {
        /// The declared data type tag.
        data_type: String,
        /// Parser message.
        message: String,
    },

    /// A key already exists in the other scope.
    #[error("state key {key} already exists with scope {existing}")]
    ScopeConflict {
        /// Conflicting key.
        key: String,
        /// Scope the key already lives in.
        existing: String,
    },
}

/// Failure reported by an audit log collaborator while purging.
#[derive(Debug, Error)]
#[error("log purge failed: {0}")]
pub struct PurgeError(pub String);
