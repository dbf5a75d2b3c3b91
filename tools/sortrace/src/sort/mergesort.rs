use super::RecordingPolicy;
use crate::snapshot::SnapshotSequence;

/// Run top-down mergesort over a copy of `input`.
///
/// Every `policy.merge_snapshot_interval`-th merge captures the working
/// array, but only while the array is no longer than
/// `policy.periodic_snapshot_max_len`. A final snapshot of the sorted array
/// is always appended, so the sequence is never empty.
pub fn record_mergesort<T: Ord + Clone>(
    input: &[T],
    policy: &RecordingPolicy,
) -> SnapshotSequence<T> {
    let mut recorder = MergesortRecorder {
        working: input.to_vec(),
        aux: input.to_vec(),
        merges: 0,
        interval: policy.merge_snapshot_interval.max(1) as usize,
        periodic: input.len() <= policy.periodic_snapshot_max_len,
        sequence: SnapshotSequence::new(input.len()),
    };
    if let Some(end) = input.len().checked_sub(1) {
        recorder.sort_range(0, end);
    }
    recorder.sequence.capture(&recorder.working);
    recorder.sequence
}

struct MergesortRecorder<T> {
    working: Vec<T>,
    /// Allocated once and reused by every merge.
    aux: Vec<T>,
    merges: usize,
    interval: usize,
    periodic: bool,
    sequence: SnapshotSequence<T>,
}

impl<T: Ord + Clone> MergesortRecorder<T> {
    fn sort_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mid = start + (end - start) / 2;
        self.sort_range(start, mid);
        self.sort_range(mid + 1, end);
        self.merge(start, mid, end);
    }

    /// Merges `[start, mid]` and `[mid + 1, end]` through `aux`.
    fn merge(&mut self, start: usize, mid: usize, end: usize) {
        let (mut left, mut right) = (start, mid + 1);
        for slot in start..=end {
            let take_left =
                right > end || (left <= mid && self.working[left] <= self.working[right]);
            if take_left {
                self.aux[slot] = self.working[left].clone();
                left += 1;
            } else {
                self.aux[slot] = self.working[right].clone();
                right += 1;
            }
        }
        self.working[start..=end].clone_from_slice(&self.aux[start..=end]);

        self.merges += 1;
        if self.merges % self.interval == 0 && self.periodic {
            self.sequence.capture(&self.working);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::record_mergesort;
    use crate::sort::test_support::{is_sorted, lcg_values, sorted_copy};
    use crate::sort::RecordingPolicy;

    fn record(values: &[i64]) -> Vec<Vec<i64>> {
        record_mergesort(values, &RecordingPolicy::default())
            .iter()
            .map(|snapshot| snapshot.to_vec())
            .collect()
    }

    #[test]
    fn empty_input_records_only_the_final_snapshot() {
        let sequence = record_mergesort::<i64>(&[], &RecordingPolicy::default());
        assert_eq!(sequence.len(), 1);
        assert!(sequence.last().expect("final").is_empty());
    }

    #[test]
    fn singleton_records_only_the_final_snapshot() {
        assert_eq!(record(&[42]), vec![vec![42]]);
    }

    #[test]
    fn five_elements_need_four_merges_and_get_no_periodic_snapshot() {
        assert_eq!(record(&[5, 3, 1, 4, 2]), vec![vec![1, 2, 3, 4, 5]]);
    }

    #[test]
    fn fifth_merge_is_captured() {
        // Ten elements take nine merges; the fifth is the first one in the right half.
        let sequence = record(&[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(
            sequence,
            vec![
                vec![6, 7, 8, 9, 10, 4, 5, 3, 2, 1],
                vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            ]
        );
    }

    #[test]
    fn periodic_count_follows_the_merge_counter() {
        for len in [2_usize, 6, 11, 50, 100] {
            let input = lcg_values(len, 17);
            let sequence = record_mergesort(&input, &RecordingPolicy::default());
            // A range of n elements always takes n - 1 merges.
            assert_eq!(sequence.len(), (len - 1) / 5 + 1, "len {len}");
        }
    }

    #[test]
    fn arrays_above_the_cap_only_get_the_final_snapshot() {
        let input = lcg_values(101, 4);
        let sequence = record_mergesort(&input, &RecordingPolicy::default());
        assert_eq!(sequence.len(), 1);
        assert_eq!(
            sequence.last().expect("final").as_slice(),
            sorted_copy(&input).as_slice()
        );
    }

    #[test]
    fn custom_policy_changes_cadence_and_cap() {
        let input = lcg_values(12, 8);
        let every_merge = RecordingPolicy {
            merge_snapshot_interval: 1,
            periodic_snapshot_max_len: 12,
        };
        assert_eq!(record_mergesort(&input, &every_merge).len(), 12);

        let capped = RecordingPolicy {
            merge_snapshot_interval: 1,
            periodic_snapshot_max_len: 11,
        };
        assert_eq!(record_mergesort(&input, &capped).len(), 1);
    }

    #[test]
    fn all_equal_values_sort_and_caller_input_is_untouched() {
        let input = vec![2_i64, 2, 2];
        assert_eq!(record(&input), vec![vec![2, 2, 2]]);
        assert_eq!(input, vec![2, 2, 2]);
    }

    #[test]
    fn snapshots_are_permutations_and_the_last_is_sorted() {
        for (len, seed) in [(3, 1), (25, 2), (64, 3), (100, 4), (333, 5)] {
            let input = lcg_values(len, seed);
            let expected = sorted_copy(&input);
            let sequence = record_mergesort(&input, &RecordingPolicy::default());
            for snapshot in &sequence {
                assert_eq!(sorted_copy(snapshot.as_slice()), expected);
            }
            let last = sequence.last().expect("final");
            assert!(is_sorted(last.as_slice()));
            assert_eq!(last.as_slice(), expected.as_slice());
        }
    }
}
