//! Protocol error types

use thiserror::Error;

/// Errors raised while encoding or decoding frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Gzip stream could not be inflated or deflated
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// Payload does not match the shape its discriminant announces
    #[error("Invalid {response_type} payload: {reason}")]
    InvalidPayload {
        response_type: &'static str,
        reason: String,
    },
}

impl From<rmp_serde::encode::Error> for ProtocolError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ProtocolError::SerializationError(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ProtocolError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        ProtocolError::DeserializationError(err.to_string())
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::CompressionError(err.to_string())
    }
}
