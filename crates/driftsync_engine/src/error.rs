//! Error types for the sync engine.

use crate::config::ConfigField;
use crate::scheduler::TaskId;
use driftsync_model::ModelError;
use driftsync_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The sync configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Remote store error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Entity payload codec error.
    #[error("codec error: {0}")]
    Codec(#[from] ModelError),

    /// The run was cancelled before a stage could start.
    #[error("run cancelled before stage {stage}")]
    Cancelled {
        /// Stage that did not run.
        stage: &'static str,
    },

    /// Background scheduler rejected a registration or submission.
    #[error("background scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl SyncError {
    /// Returns true if the next trigger may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(err) => err.is_retryable(),
            SyncError::Cancelled { .. } => true,
            _ => false,
        }
    }
}

/// Errors reported by a remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The call did not complete within the configured timeout.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Network or backend transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// The backend refused one entity.
    #[error("remote rejected {id}: {reason}")]
    Rejected {
        /// Entity identifier.
        id: String,
        /// Reason given by the backend.
        reason: String,
    },

    /// No connection to the backend.
    #[error("not connected to remote")]
    NotConnected,
}

impl RemoteError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport { retryable, .. } => *retryable,
            RemoteError::Timeout(_) | RemoteError::NotConnected => true,
            RemoteError::Rejected { .. } => false,
        }
    }
}

/// A sync configuration with values below the minimum-safety floors.
///
/// Lists every offending field, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid sync configuration, below minimum: {}", field_list(.fields))]
pub struct ConfigError {
    /// Offending fields, in declaration order.
    pub fields: Vec<ConfigField>,
}

impl ConfigError {
    /// Returns the offending field names.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name()).collect()
    }
}

fn field_list(fields: &[ConfigField]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by a background scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A request was submitted for a task id with no registered handler.
    #[error("background task {0} is not registered")]
    NotRegistered(TaskId),

    /// The platform refused the request.
    #[error("background scheduling unavailable: {0}")]
    Unavailable(String),
}
