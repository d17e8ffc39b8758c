//! Error types for the conversation store.
//!
//! [`StoreError`] is returned by every repository primitive and every engine
//! operation. Missing conversations are not errors: lookups come back empty
//! and mutations report `false`.

use thiserror::Error;

use rewind_core::StateError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error (document backend).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// A state snapshot could not be built.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A conversation ID cannot be used by this backend.
    #[error("invalid conversation id: {0}")]
    InvalidId(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Internal error (e.g. an injected or unexpected backend failure).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn migration_error_display() {
        let err = StoreError::Migration {
            message: "v001 failed: table already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "migration error: v001 failed: table already exists"
        );
    }

    #[test]
    fn from_state_error() {
        let err: StoreError = StateError::Readonly("locale".into()).into();
        assert!(matches!(err, StoreError::State(StateError::Readonly(_))));
        assert_eq!(err.to_string(), "state error: state key is readonly: locale");
    }

    #[test]
    fn from_io_error() {
        let err: StoreError = std::io::Error::other("disk gone").into();
        assert!(err.to_string().contains("disk gone"));
    }
}
