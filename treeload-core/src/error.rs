//! Core error types for treeload

use thiserror::Error;

/// Errors raised while building position paths or ground-truth datasets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// Requested record count is negative
    #[error("Invalid record count: {0} (must be >= 0)")]
    InvalidCount(i64),

    /// Requested maximum prefix depth is below one
    #[error("Invalid max depth: {0} (must be >= 1)")]
    InvalidDepth(i64),

    /// A position path must contain at least one step
    #[error("Position path cannot be empty")]
    EmptyPath,

    /// The requested size cannot be allocated
    #[error("Cannot allocate {requested} {what}")]
    TooLarge { what: &'static str, requested: i64 },

    /// Worker ids are 1-based
    #[error("Invalid worker id: {0} (must be >= 1)")]
    InvalidWorkerId(u32),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, DatasetError>;
