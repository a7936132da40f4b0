//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Serialization errors
    /// Failed to serialize data.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize data.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    // Token errors
    /// The secure-download token is not valid base64 or not UTF-8.
    #[error("invalid download token: {0}")]
    InvalidToken(String),

    /// The decoded token is too short to carry a millisecond timestamp.
    #[error("download token too short: {len} characters, need more than {min}")]
    TokenTooShort {
        /// Decoded length.
        len: usize,
        /// Minimum length (timestamp digits).
        min: usize,
    },

    // Model errors
    /// Unknown role name.
    #[error("unknown role: {0} (expected \"ops\" or \"client\")")]
    InvalidRole(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Conversions from underlying crate errors

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            ProtocolError::Deserialization(err.to_string())
        } else {
            ProtocolError::Serialization(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for ProtocolError {
    fn from(err: base64::DecodeError) -> Self {
        ProtocolError::InvalidToken(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ProtocolError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProtocolError::InvalidToken(err.to_string())
    }
}
