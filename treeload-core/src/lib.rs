//! Core domain models for treeload
//!
//! This crate defines the branch-encoded position identifiers used by the
//! document synchronization service, the total order over them, and the
//! immutable ground-truth dataset every simulated client verifies against.
//! It has no async or network dependencies.

pub mod dataset;
pub mod error;
pub mod generator;
pub mod path;
pub mod record;

// Re-export commonly used types at the crate root
pub use dataset::{Dataset, WorkerId};
pub use error::{DatasetError, Result};
pub use generator::{generate, generate_seeded, DISAMBIGUATOR_MAX};
pub use path::{compare_steps, PositionPath, Step};
pub use record::ChangeRecord;
