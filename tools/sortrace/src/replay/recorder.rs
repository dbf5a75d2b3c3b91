//! Observer wrapper that writes every played snapshot to a recording file.

use crate::errors::SortraceError;
use crate::input::{Distribution, SizePolicy};
use crate::logging::append_run_log;
use crate::playback::{PlaybackObserver, StreamReport};
use crate::replay::recording::{
    input_digest, RaceStartRecord, RecordEntry, SnapshotRecord, StreamFinishedRecord,
};
use crate::snapshot::{Snapshot, Value};
use crate::sort::Algorithm;
use serde_json::json;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Forwards to `inner` and appends a `RecordEntry` per event.
pub struct RaceRecorder<'a> {
    inner: &'a dyn PlaybackObserver<Value>,
    path: PathBuf,
    file: Mutex<File>,
}

impl<'a> RaceRecorder<'a> {
    /// Truncate `path` and write the `race_start` header.
    pub fn create(
        path: impl AsRef<Path>,
        input: &[Value],
        provenance: Option<(Distribution, SizePolicy)>,
        inner: &'a dyn PlaybackObserver<Value>,
    ) -> Result<Self, SortraceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SortraceError::Recording(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| SortraceError::Recording(format!("{}: {e}", path.display())))?;
        let recorder = Self {
            inner,
            path,
            file: Mutex::new(file),
        };
        recorder.emit(&RecordEntry::RaceStart(RaceStartRecord {
            distribution: provenance.map(|(distribution, _)| distribution),
            size: provenance.map(|(_, size)| size),
            input: input.to_vec(),
            input_digest: input_digest(input),
            recorded_at_unix_ns: timestamp_ns(),
        }))?;
        Ok(recorder)
    }

    fn emit(&self, entry: &RecordEntry) -> Result<(), SortraceError> {
        let line =
            serde_json::to_string(entry).map_err(|e| SortraceError::Recording(e.to_string()))?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{line}").map_err(|e| SortraceError::Recording(e.to_string()))
    }

    fn emit_logged(&self, entry: &RecordEntry) {
        if let Err(error) = self.emit(entry) {
            append_run_log(
                "warn",
                "recording.write_failed",
                json!({
                    "path": self.path.display().to_string(),
                    "error": error.to_string(),
                }),
            );
        }
    }
}

impl PlaybackObserver<Value> for RaceRecorder<'_> {
    fn on_snapshot(&self, algorithm: Algorithm, index: usize, snapshot: &Snapshot<Value>) {
        self.emit_logged(&RecordEntry::Snapshot(SnapshotRecord {
            algorithm,
            index,
            values: snapshot.to_vec(),
        }));
        self.inner.on_snapshot(algorithm, index, snapshot);
    }

    fn on_stream_finished(&self, report: &StreamReport) {
        self.emit_logged(&RecordEntry::StreamFinished(StreamFinishedRecord {
            algorithm: report.algorithm,
            elapsed_ms: report.elapsed_ms,
            emitted: report.emitted,
        }));
        self.inner.on_stream_finished(report);
    }
}

#[cfg(test)]
mod tests {
    use super::RaceRecorder;
    use crate::input::{Distribution, SizePolicy};
    use crate::playback::{CollectingObserver, PlaybackObserver, StreamReport};
    use crate::snapshot::{Snapshot, Value};
    use crate::sort::Algorithm;

    #[test]
    fn recorder_writes_header_then_events_and_forwards() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runs").join("race.jsonl");
        let inner = CollectingObserver::<Value>::default();
        let recorder = RaceRecorder::create(
            &path,
            &[2, 1],
            Some((Distribution::Reversed, SizePolicy::Low)),
            &inner,
        )
        .expect("create");

        recorder.on_snapshot(Algorithm::Quicksort, 0, &Snapshot::from(vec![1, 2]));
        recorder.on_stream_finished(&StreamReport {
            algorithm: Algorithm::Quicksort,
            emitted: 1,
            skipped: 0,
            elapsed_ms: 10,
        });

        let text = std::fs::read_to_string(&path).expect("read");
        let lines = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).expect("json"))
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "race_start");
        assert_eq!(lines[0]["distribution"], "reversed");
        assert_eq!(lines[1]["type"], "snapshot");
        assert_eq!(lines[1]["values"], serde_json::json!([1, 2]));
        assert_eq!(lines[2]["type"], "stream_finished");
        assert_eq!(inner.snapshots_for(Algorithm::Quicksort), vec![(0, vec![1, 2])]);
    }
}
