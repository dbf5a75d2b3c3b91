//! Immutable array states captured while a recorder sorts.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Element type used by the input provisioner, the CLI and recordings.
pub type Value = i64;

/// A full copy of a working array at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot<T = Value>(Vec<T>);

impl<T: Clone> Snapshot<T> {
    /// Copy the current contents of `values`. The copy never aliases the live array.
    pub fn capture(values: &[T]) -> Self {
        Self(values.to_vec())
    }
}

impl<T> Snapshot<T> {
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for Snapshot<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// Ordered snapshots produced by one recorder for one sort run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSequence<T = Value> {
    array_len: usize,
    snapshots: Vec<Snapshot<T>>,
}

impl<T> SnapshotSequence<T> {
    pub fn new(array_len: usize) -> Self {
        Self {
            array_len,
            snapshots: Vec::new(),
        }
    }

    /// Length every snapshot in this sequence is expected to have.
    pub fn array_len(&self) -> usize {
        self.array_len
    }

    /// Append an already materialized snapshot, e.g. one loaded from a recording.
    /// Length is not checked here; playback rejects malformed entries.
    pub fn push(&mut self, snapshot: Snapshot<T>) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot<T>> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot<T>> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot<T>> {
        self.snapshots.iter()
    }

    pub fn is_well_formed(&self, snapshot: &Snapshot<T>) -> bool {
        snapshot.len() == self.array_len
    }
}

impl<T: Clone> SnapshotSequence<T> {
    pub(crate) fn capture(&mut self, values: &[T]) {
        debug_assert_eq!(values.len(), self.array_len);
        self.snapshots.push(Snapshot::capture(values));
    }
}

impl<'a, T> IntoIterator for &'a SnapshotSequence<T> {
    type Item = &'a Snapshot<T>;
    type IntoIter = std::slice::Iter<'a, Snapshot<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
