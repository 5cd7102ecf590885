//! Per-worker record of edits observed from the service

use std::collections::BTreeMap;
use treeload_core::{ChangeRecord, Dataset, PositionPath};

/// Edit notifications a worker has seen, keyed and ordered by path.
///
/// A second notification for the same path replaces the first, so the set
/// never holds two records with equal paths.
#[derive(Debug, Clone, Default)]
pub struct ReceivedSet {
    records: BTreeMap<PositionPath, char>,
}

impl ReceivedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record; returns `true` when its path was not seen before
    pub fn insert(&mut self, record: ChangeRecord) -> bool {
        self.records.insert(record.path, record.payload).is_none()
    }

    pub fn remove(&mut self, path: &PositionPath) -> Option<ChangeRecord> {
        self.records
            .remove_entry(path)
            .map(|(path, payload)| ChangeRecord::new(path, payload))
    }

    pub fn contains(&self, path: &PositionPath) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending path order
    pub fn sorted(&self) -> Vec<ChangeRecord> {
        self.records
            .iter()
            .map(|(path, payload)| ChangeRecord::new(path.clone(), *payload))
            .collect()
    }

    /// True iff the sorted paths appear in `dataset` in the same relative order
    pub fn is_in_order_of(&self, dataset: &Dataset) -> bool {
        let mut truth = dataset.iter();
        self.records
            .keys()
            .all(|path| truth.any(|record| &record.path == path))
    }
}
