//! Error types for local store operations.

use driftsync_model::ModelError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An entity payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] ModelError),

    /// A table file could not be read back.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The entity does not exist.
    #[error("{entity} entity not found: {id}")]
    NotFound {
        /// Entity type name.
        entity: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Another process holds the store directory.
    #[error("store locked: another process has exclusive access to {}", path.display())]
    Locked {
        /// Store directory.
        path: PathBuf,
    },

    /// An entity type name cannot be used as a table name.
    #[error("invalid entity type name: {0:?}")]
    InvalidEntityName(String),
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StoreError::not_found("notes", "n-1");
        assert_eq!(err.to_string(), "notes entity not found: n-1");
    }

    #[test]
    fn locked_display_includes_path() {
        let err = StoreError::Locked {
            path: PathBuf::from("/tmp/store"),
        };
        assert!(err.to_string().contains("/tmp/store"));
    }
}
