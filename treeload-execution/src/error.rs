//! Error types for worker execution

use std::time::Duration;
use thiserror::Error;

/// Failures of a single connection. Recorded per worker, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Handshake rejected with status {0}")]
    Rejected(u16),

    #[error("Connection timeout ({0:?})")]
    Timeout(Duration),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,
}

impl TransportError {
    /// HTTP status observed during the handshake, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Rejected(status) => Some(*status),
            _ => None,
        }
    }
}

/// Run-level errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dataset error: {0}")]
    Dataset(#[from] treeload_core::DatasetError),

    #[error("Worker task failed: {0}")]
    Join(String),
}

impl ExecutionError {
    /// Whether the error was raised before any worker was spawned
    pub fn is_configuration(&self) -> bool {
        matches!(self, ExecutionError::Configuration(_) | ExecutionError::Dataset(_))
    }
}

// Convert from config errors
impl From<treeload_config::ConfigError> for ExecutionError {
    fn from(err: treeload_config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ExecutionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}
