//! Load a race recording back into snapshot sequences.

use crate::errors::SortraceError;
use crate::logging::append_run_log;
use crate::replay::recording::{
    input_digest, RaceStartRecord, RecordEntry, SnapshotRecord, StreamFinishedRecord,
};
use crate::snapshot::{Snapshot, SnapshotSequence, Value};
use crate::sort::Algorithm;
use serde_json::json;
use std::path::Path;

/// A parsed recording file, ready for replay.
#[derive(Debug, Clone)]
pub struct RaceRecording {
    pub header: RaceStartRecord,
    pub quicksort: SnapshotSequence<Value>,
    pub mergesort: SnapshotSequence<Value>,
    pub finished: Vec<StreamFinishedRecord>,
}

impl RaceRecording {
    pub fn load(path: &Path) -> Result<Self, SortraceError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SortraceError::Recording(format!("{}: {e}", path.display())))?;
        let recording = Self::parse(&raw)?;
        append_run_log(
            "info",
            "recording.loaded",
            json!({
                "path": path.display().to_string(),
                "len": recording.header.input.len(),
                "quicksort_steps": recording.quicksort.len(),
                "mergesort_steps": recording.mergesort.len(),
            }),
        );
        Ok(recording)
    }

    pub fn parse(raw: &str) -> Result<Self, SortraceError> {
        let mut header: Option<RaceStartRecord> = None;
        let mut snapshots: Vec<(usize, SnapshotRecord)> = Vec::new();
        let mut finished = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: RecordEntry = serde_json::from_str(line).map_err(|e| {
                SortraceError::Recording(format!("recording line {}: {e}", idx + 1))
            })?;
            match entry {
                RecordEntry::RaceStart(start) => {
                    if header.is_some() {
                        return Err(SortraceError::Recording(format!(
                            "recording line {}: second race_start",
                            idx + 1
                        )));
                    }
                    header = Some(start);
                }
                RecordEntry::Snapshot(snapshot) => snapshots.push((idx + 1, snapshot)),
                RecordEntry::StreamFinished(done) => finished.push(done),
            }
        }
        let header = header.ok_or_else(|| {
            SortraceError::Recording("recording has no race_start entry".to_string())
        })?;

        let digest = input_digest(&header.input);
        if digest != header.input_digest {
            return Err(SortraceError::Recording(format!(
                "input digest mismatch: header says {}, input hashes to {digest}",
                header.input_digest
            )));
        }

        let array_len = header.input.len();
        let mut quicksort = SnapshotSequence::new(array_len);
        let mut mergesort = SnapshotSequence::new(array_len);
        let mut last_quicksort: Option<usize> = None;
        let mut last_mergesort: Option<usize> = None;
        // Snapshots of the two streams interleave in the file; per stream the
        // indices must strictly increase. Gaps are allowed (skipped snapshots).
        for (line_no, record) in snapshots {
            let (target, last) = match record.algorithm {
                Algorithm::Quicksort => (&mut quicksort, &mut last_quicksort),
                Algorithm::Mergesort => (&mut mergesort, &mut last_mergesort),
            };
            if let Some(previous) = *last {
                if record.index <= previous {
                    return Err(SortraceError::Recording(format!(
                        "recording line {line_no}: {} snapshot index {} follows index {previous}",
                        record.algorithm.as_str(),
                        record.index
                    )));
                }
            }
            *last = Some(record.index);
            target.push(Snapshot::from(record.values));
        }

        Ok(Self {
            header,
            quicksort,
            mergesort,
            finished,
        })
    }

    pub fn sequence(&self, algorithm: Algorithm) -> &SnapshotSequence<Value> {
        match algorithm {
            Algorithm::Quicksort => &self.quicksort,
            Algorithm::Mergesort => &self.mergesort,
        }
    }
}
