//! Logging setup for treeload
//!
//! Thin layer over `tracing-subscriber`: picks the filter and output format
//! from [`LoggingConfig`] and installs a global subscriber once.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use treeload_config::LoggingConfig;
