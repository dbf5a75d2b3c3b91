//! One side-by-side run: record both sorts, then replay them concurrently.

use crate::errors::SortraceError;
use crate::logging::append_run_log;
use crate::playback::{PlaybackObserver, PlaybackReport, PlaybackScheduler, PlaybackStream};
use crate::runtime::Clock;
use crate::snapshot::{SnapshotSequence, Value};
use crate::sort::{record_mergesort, record_quicksort, Algorithm, RecordingPolicy};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSettings {
    pub quicksort_delay: Duration,
    pub mergesort_delay: Duration,
    pub policy: RecordingPolicy,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            quicksort_delay: Algorithm::Quicksort.default_step_delay(),
            mergesort_delay: Algorithm::Mergesort.default_step_delay(),
            policy: RecordingPolicy::default(),
        }
    }
}

impl RaceSettings {
    pub fn delay(&self, algorithm: Algorithm) -> Duration {
        match algorithm {
            Algorithm::Quicksort => self.quicksort_delay,
            Algorithm::Mergesort => self.mergesort_delay,
        }
    }
}

/// Busy flag and per-stream timers visible to the caller while a race runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub busy: bool,
    pub quicksort_elapsed_ms: u64,
    pub mergesort_elapsed_ms: u64,
}

impl RunState {
    pub fn elapsed_ms(&self, algorithm: Algorithm) -> u64 {
        match algorithm {
            Algorithm::Quicksort => self.quicksort_elapsed_ms,
            Algorithm::Mergesort => self.mergesort_elapsed_ms,
        }
    }

    fn set_elapsed_ms(&mut self, algorithm: Algorithm, elapsed_ms: u64) {
        match algorithm {
            Algorithm::Quicksort => self.quicksort_elapsed_ms = elapsed_ms,
            Algorithm::Mergesort => self.mergesort_elapsed_ms = elapsed_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub quicksort: SnapshotSequence<Value>,
    pub mergesort: SnapshotSequence<Value>,
    pub playback: PlaybackReport,
}

impl RaceOutcome {
    pub fn sequence(&self, algorithm: Algorithm) -> &SnapshotSequence<Value> {
        match algorithm {
            Algorithm::Quicksort => &self.quicksort,
            Algorithm::Mergesort => &self.mergesort,
        }
    }
}

pub struct SortRace {
    clock: Arc<dyn Clock>,
    settings: RaceSettings,
    state: Arc<Mutex<RunState>>,
}

impl SortRace {
    pub fn new(clock: Arc<dyn Clock>, settings: RaceSettings) -> Self {
        Self {
            clock,
            settings,
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    /// Shared handle to the run state, e.g. for an observer that renders timers.
    pub fn state_handle(&self) -> Arc<Mutex<RunState>> {
        Arc::clone(&self.state)
    }

    /// Sort `input` with both recorders and play the results back.
    ///
    /// Fails with `RunInProgress` if another run on this race has not
    /// finished. The caller's slice is never modified.
    pub fn run(
        &self,
        input: &[Value],
        observer: &dyn PlaybackObserver<Value>,
    ) -> Result<RaceOutcome, SortraceError> {
        let _busy = self.begin()?;
        let started_at = self.clock.now();
        append_run_log("info", "race.started", json!({ "len": input.len() }));

        let quicksort = record_quicksort(input);
        let mergesort = record_mergesort(input, &self.settings.policy);
        append_run_log(
            "info",
            "race.recorded",
            json!({
                "len": input.len(),
                "quicksort_steps": quicksort.len(),
                "mergesort_steps": mergesort.len(),
            }),
        );

        let playback = self.play(started_at, &quicksort, &mergesort, observer)?;
        Ok(RaceOutcome {
            quicksort,
            mergesort,
            playback,
        })
    }

    /// Replay sequences recorded earlier, with the same busy/timer bookkeeping as `run`.
    pub fn replay(
        &self,
        quicksort: &SnapshotSequence<Value>,
        mergesort: &SnapshotSequence<Value>,
        observer: &dyn PlaybackObserver<Value>,
    ) -> Result<PlaybackReport, SortraceError> {
        let _busy = self.begin()?;
        let started_at = self.clock.now();
        append_run_log(
            "info",
            "race.started",
            json!({ "len": quicksort.array_len(), "replay": true }),
        );
        self.play(started_at, quicksort, mergesort, observer)
    }

    fn play(
        &self,
        started_at: std::time::SystemTime,
        quicksort: &SnapshotSequence<Value>,
        mergesort: &SnapshotSequence<Value>,
        observer: &dyn PlaybackObserver<Value>,
    ) -> Result<PlaybackReport, SortraceError> {
        let scheduler = PlaybackScheduler::new(Arc::clone(&self.clock));
        let report = scheduler.play(
            started_at,
            [
                PlaybackStream {
                    algorithm: Algorithm::Quicksort,
                    sequence: quicksort,
                    step_delay: self.settings.quicksort_delay,
                },
                PlaybackStream {
                    algorithm: Algorithm::Mergesort,
                    sequence: mergesort,
                    step_delay: self.settings.mergesort_delay,
                },
            ],
            observer,
            |stream| {
                self.lock_state()
                    .set_elapsed_ms(stream.algorithm, stream.elapsed_ms);
            },
        )?;
        append_run_log(
            "info",
            "race.finished",
            json!({
                "quicksort_ms": report.quicksort.elapsed_ms,
                "mergesort_ms": report.mergesort.elapsed_ms,
                "finish_order": report
                    .finish_order
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>(),
            }),
        );
        Ok(report)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, SortraceError> {
        let mut state = self.lock_state();
        if state.busy {
            return Err(SortraceError::RunInProgress);
        }
        *state = RunState {
            busy: true,
            ..RunState::default()
        };
        Ok(BusyGuard { race: self })
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the busy flag when the run ends, whichever way it ends.
struct BusyGuard<'a> {
    race: &'a SortRace,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.race.lock_state().busy = false;
    }
}
