//! Error types for the model crate.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while encoding or decoding entity payloads.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The entity could not be encoded to CBOR.
    #[error("failed to encode {entity}: {message}")]
    Encode {
        /// Entity type name.
        entity: &'static str,
        /// Underlying codec message.
        message: String,
    },

    /// The payload could not be decoded into the entity type.
    #[error("failed to decode {entity}: {message}")]
    Decode {
        /// Entity type name.
        entity: &'static str,
        /// Underlying codec message.
        message: String,
    },
}

impl ModelError {
    /// Creates an encode error.
    pub fn encode(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            entity,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            entity,
            message: message.into(),
        }
    }
}
