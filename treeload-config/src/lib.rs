//! Domain-driven configuration management for treeload
//!
//! Configuration is split by functional domain (target service, dataset,
//! worker timing, verification switches, logging), each with validation,
//! defaults, and environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    dataset::DatasetConfig, logging::LoggingConfig, target::TargetConfig,
    verification::VerificationConfig, worker::WorkerConfig, HarnessConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration_ms;
