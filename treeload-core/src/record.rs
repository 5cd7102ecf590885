//! Change records: one positioned single-character edit

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::path::PositionPath;

/// One atomic edit at a given position.
///
/// Records are ordered by path only; the payload never participates in the
/// order, so two records with the same path compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "a")]
    pub path: PositionPath,

    #[serde(rename = "b")]
    pub payload: char,
}

impl ChangeRecord {
    pub fn new(path: PositionPath, payload: char) -> Self {
        Self { path, payload }
    }

    /// Order two records by their position paths
    pub fn cmp_by_path(&self, other: &ChangeRecord) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.payload, self.path)
    }
}
