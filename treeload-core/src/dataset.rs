//! The immutable, sorted ground-truth dataset shared by every worker

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::DatasetError;
use crate::path::PositionPath;
use crate::record::ChangeRecord;

/// 1-based ordinal of a worker in the pool (newtype pattern for type safety)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WorkerId(NonZeroU32);

impl WorkerId {
    pub fn new(id: u32) -> Result<Self, DatasetError> {
        NonZeroU32::new(id)
            .map(WorkerId)
            .ok_or(DatasetError::InvalidWorkerId(id))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Iterate over the ids `1..=population`
    pub fn range(population: u32) -> impl Iterator<Item = WorkerId> {
        (1..=population).filter_map(NonZeroU32::new).map(WorkerId)
    }
}

impl TryFrom<u32> for WorkerId {
    type Error = DatasetError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        WorkerId::new(id)
    }
}

impl From<WorkerId> for u32 {
    fn from(id: WorkerId) -> Self {
        id.get()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sorted, immutable sequence of change records.
///
/// Cloning is cheap: every clone is a read-only handle onto the same
/// allocation, which is how the dataset is shared across workers.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[ChangeRecord]>,
}

impl Dataset {
    /// Sort `records` by path and freeze them.
    ///
    /// Paths are expected to be pairwise distinct; duplicates are kept as-is.
    pub fn from_records(mut records: Vec<ChangeRecord>) -> Self {
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            records: records.into(),
        }
    }

    pub fn empty() -> Self {
        Self::from_records(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ChangeRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    /// Index of the record with this exact path, found by binary search
    pub fn position_of(&self, path: &PositionPath) -> Option<usize> {
        self.records
            .binary_search_by(|record| record.path.cmp(path))
            .ok()
    }

    /// O(log n) membership test against the ground truth
    pub fn contains(&self, path: &PositionPath) -> bool {
        self.position_of(path).is_some()
    }

    /// Records this worker is responsible for sending: every index `i`
    /// with `i % id == 0`.
    ///
    /// Shards overlap and shrink as the id grows; index 0 belongs to every
    /// worker. This is the observed partition rule and is kept as-is.
    pub fn shard(&self, worker: WorkerId) -> Vec<ChangeRecord> {
        let step = worker.get() as usize;
        self.records.iter().step_by(step).cloned().collect()
    }

    /// Ascending under the path order for every adjacent pair
    pub fn is_sorted(&self) -> bool {
        self.records.windows(2).all(|pair| pair[0].path <= pair[1].path)
    }

    /// Shares the same allocation as `other`
    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
