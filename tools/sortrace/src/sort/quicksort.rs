use crate::snapshot::SnapshotSequence;

/// Run median-of-three quicksort over a copy of `input`.
///
/// One snapshot of the whole working array is captured after every
/// partition. Ranges shorter than two elements are not partitioned, so an
/// input of length 0 or 1 yields an empty sequence.
pub fn record_quicksort<T: Ord + Clone>(input: &[T]) -> SnapshotSequence<T> {
    let mut recorder = QuicksortRecorder {
        working: input.to_vec(),
        sequence: SnapshotSequence::new(input.len()),
    };
    if let Some(end) = input.len().checked_sub(1) {
        recorder.sort_range(0, end);
    }
    recorder.sequence
}

struct QuicksortRecorder<T> {
    working: Vec<T>,
    sequence: SnapshotSequence<T>,
}

impl<T: Ord + Clone> QuicksortRecorder<T> {
    /// Sorts the inclusive range `[start, end]`.
    ///
    /// The left side recurses and the right side loops, which keeps the
    /// snapshot order of plain double recursion while bounding stack depth
    /// on inputs full of equal values.
    fn sort_range(&mut self, mut start: usize, end: usize) {
        while start < end {
            let pivot = self.partition_median_of_three(start, end);
            self.sequence.capture(&self.working);
            if pivot > start {
                self.sort_range(start, pivot - 1);
            }
            start = pivot + 1;
        }
    }

    fn partition_median_of_three(&mut self, start: usize, end: usize) -> usize {
        let mid = start + (end - start) / 2;
        let mut candidates = [start, mid, end];
        // Stable, so ties resolve to the earlier of start/mid/end.
        candidates.sort_by(|&a, &b| self.working[a].cmp(&self.working[b]));
        self.working.swap(candidates[1], end);
        self.partition(start, end)
    }

    /// Lomuto partition around the value at `end`; returns its final index.
    fn partition(&mut self, start: usize, end: usize) -> usize {
        let mut boundary = start;
        for j in start..end {
            if self.working[j] < self.working[end] {
                self.working.swap(boundary, j);
                boundary += 1;
            }
        }
        self.working.swap(boundary, end);
        boundary
    }
}

#[cfg(test)]
mod tests {
    use super::record_quicksort;
    use crate::sort::test_support::{is_sorted, lcg_values, sorted_copy};

    fn states(values: &[i64]) -> Vec<Vec<i64>> {
        record_quicksort(values)
            .iter()
            .map(|snapshot| snapshot.to_vec())
            .collect()
    }

    #[test]
    fn five_element_trace_matches_hand_computed_partitions() {
        assert_eq!(
            states(&[5, 3, 1, 4, 2]),
            vec![vec![1, 2, 5, 4, 3], vec![1, 2, 3, 4, 5]]
        );
    }

    #[test]
    fn empty_and_singleton_inputs_record_nothing() {
        assert!(record_quicksort::<i64>(&[]).is_empty());
        assert!(record_quicksort(&[7_i64]).is_empty());
    }

    #[test]
    fn all_equal_values_terminate_with_snapshots() {
        let sequence = states(&[2, 2, 2]);
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.last(), Some(&vec![2, 2, 2]));
    }

    #[test]
    fn two_elements_are_partitioned_once() {
        assert_eq!(states(&[2, 1]), vec![vec![1, 2]]);
        assert_eq!(states(&[1, 2]), vec![vec![1, 2]]);
    }

    #[test]
    fn caller_input_is_left_untouched() {
        let input = vec![9_i64, 8, 7, 6];
        let _ = record_quicksort(&input);
        assert_eq!(input, vec![9, 8, 7, 6]);
    }

    #[test]
    fn every_snapshot_is_a_permutation_and_the_last_is_sorted() {
        for (len, seed) in [(2, 1), (3, 7), (10, 11), (50, 3), (100, 5), (257, 9)] {
            let input = lcg_values(len, seed);
            let expected = sorted_copy(&input);
            let sequence = record_quicksort(&input);

            assert!(!sequence.is_empty(), "len {len}");
            for snapshot in &sequence {
                assert_eq!(snapshot.len(), input.len());
                assert_eq!(sorted_copy(snapshot.as_slice()), expected);
            }
            let last = sequence.last().expect("non-empty");
            assert!(is_sorted(last.as_slice()));
            assert_eq!(last.as_slice(), expected.as_slice());
        }
    }

    #[test]
    fn long_run_of_equal_values_does_not_exhaust_the_stack() {
        let input = vec![4_u8; 5_000];
        let sequence = record_quicksort(&input);
        assert_eq!(sequence.len(), input.len() - 1);
    }
}
