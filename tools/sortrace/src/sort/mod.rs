//! Sorting algorithms instrumented to record intermediate array states.
//!
//! Each recorder works on its own copy of the input and returns a fully
//! materialized [`SnapshotSequence`]; nothing here suspends or sleeps.

pub mod mergesort;
pub mod quicksort;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use mergesort::record_mergesort;
pub use quicksort::record_quicksort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Quicksort,
    Mergesort,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Quicksort, Algorithm::Mergesort];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quicksort => "quicksort",
            Self::Mergesort => "mergesort",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Quicksort => "Quick Sort",
            Self::Mergesort => "Merge Sort",
        }
    }

    /// Pause between two emitted snapshots during playback.
    pub fn default_step_delay(self) -> Duration {
        match self {
            Self::Quicksort => Duration::from_millis(10),
            Self::Mergesort => Duration::from_millis(20),
        }
    }
}

/// Throttling knobs for the mergesort recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingPolicy {
    /// Every n-th completed merge appends a snapshot.
    pub merge_snapshot_interval: u32,
    /// Periodic snapshots are suppressed for arrays longer than this.
    pub periodic_snapshot_max_len: usize,
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self {
            merge_snapshot_interval: 5,
            periodic_snapshot_max_len: 100,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    pub fn is_sorted<T: Ord>(values: &[T]) -> bool {
        values.windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn sorted_copy<T: Ord + Clone>(values: &[T]) -> Vec<T> {
        let mut copy = values.to_vec();
        copy.sort();
        copy
    }

    /// Deterministic pseudo-random fill (LCG) with plenty of duplicates.
    pub fn lcg_values(len: usize, seed: u32) -> Vec<i64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                i64::from((state >> 16) % 37) - 10
            })
            .collect()
    }
}
