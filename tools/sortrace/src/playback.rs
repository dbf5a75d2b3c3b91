//! Concurrent replay of two snapshot sequences.
//!
//! Each stream runs on its own thread: emit a snapshot, then sleep for the
//! stream's step delay, until the sequence is exhausted. Streams share
//! nothing mutable; completion reports travel back to the calling thread
//! over a channel, and `play` returns only once both streams are done.

use crate::errors::SortraceError;
use crate::logging::append_run_log;
use crate::runtime::Clock;
use crate::snapshot::{Snapshot, SnapshotSequence};
use crate::sort::Algorithm;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

/// Receives snapshots as streams advance. Called from both stream threads.
pub trait PlaybackObserver<T>: Send + Sync {
    fn on_snapshot(&self, algorithm: Algorithm, index: usize, snapshot: &Snapshot<T>);
    fn on_stream_finished(&self, report: &StreamReport);
}

#[derive(Debug, Clone, Copy)]
pub struct PlaybackStream<'a, T> {
    pub algorithm: Algorithm,
    pub sequence: &'a SnapshotSequence<T>,
    pub step_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub algorithm: Algorithm,
    pub emitted: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub quicksort: StreamReport,
    pub mergesort: StreamReport,
    pub finish_order: Vec<Algorithm>,
}

impl PlaybackReport {
    pub fn stream(&self, algorithm: Algorithm) -> &StreamReport {
        match algorithm {
            Algorithm::Quicksort => &self.quicksort,
            Algorithm::Mergesort => &self.mergesort,
        }
    }
}

pub struct PlaybackScheduler {
    clock: Arc<dyn Clock>,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Drive both streams from the shared `started_at` instant.
    ///
    /// `on_stream_finished` runs on the calling thread as each stream
    /// completes, before the observer hears about it.
    pub fn play<T: Sync>(
        &self,
        started_at: SystemTime,
        streams: [PlaybackStream<'_, T>; 2],
        observer: &dyn PlaybackObserver<T>,
        mut on_stream_finished: impl FnMut(&StreamReport),
    ) -> Result<PlaybackReport, SortraceError> {
        if streams[0].algorithm == streams[1].algorithm {
            return Err(SortraceError::Playback(format!(
                "both streams are {}",
                streams[0].algorithm.as_str()
            )));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Result<StreamReport, SortraceError>>();
        let mut finished = Vec::with_capacity(2);
        let mut first_error = None;

        std::thread::scope(|scope| {
            for stream in &streams {
                let tx = tx.clone();
                let clock = Arc::clone(&self.clock);
                scope.spawn(move || {
                    let result = run_stream(clock.as_ref(), started_at, stream, observer);
                    let _ = tx.send(result);
                });
            }
            drop(tx);

            while let Some(result) = rx.blocking_recv() {
                match result {
                    Ok(report) => {
                        append_run_log(
                            "info",
                            "playback.stream.finished",
                            json!({
                                "algorithm": report.algorithm.as_str(),
                                "emitted": report.emitted,
                                "skipped": report.skipped,
                                "elapsed_ms": report.elapsed_ms,
                            }),
                        );
                        on_stream_finished(&report);
                        observer.on_stream_finished(&report);
                        finished.push(report);
                    }
                    Err(error) => {
                        first_error.get_or_insert(error);
                    }
                }
            }
        });

        if let Some(error) = first_error {
            return Err(error);
        }
        let finish_order = finished.iter().map(|r| r.algorithm).collect::<Vec<_>>();
        let mut quicksort = None;
        let mut mergesort = None;
        for report in finished {
            match report.algorithm {
                Algorithm::Quicksort => quicksort = Some(report),
                Algorithm::Mergesort => mergesort = Some(report),
            }
        }
        match (quicksort, mergesort) {
            (Some(quicksort), Some(mergesort)) => Ok(PlaybackReport {
                quicksort,
                mergesort,
                finish_order,
            }),
            _ => Err(SortraceError::Playback(
                "a stream ended without reporting".to_string(),
            )),
        }
    }
}

fn run_stream<T>(
    clock: &dyn Clock,
    started_at: SystemTime,
    stream: &PlaybackStream<'_, T>,
    observer: &dyn PlaybackObserver<T>,
) -> Result<StreamReport, SortraceError> {
    let mut emitted = 0;
    let mut skipped = 0;
    for (index, snapshot) in stream.sequence.iter().enumerate() {
        if !stream.sequence.is_well_formed(snapshot) {
            append_run_log(
                "error",
                "playback.snapshot.malformed",
                json!({
                    "algorithm": stream.algorithm.as_str(),
                    "index": index,
                    "expected_len": stream.sequence.array_len(),
                    "actual_len": snapshot.len(),
                }),
            );
            skipped += 1;
            continue;
        }
        observer.on_snapshot(stream.algorithm, index, snapshot);
        emitted += 1;
        clock.sleep_until(clock.now() + stream.step_delay)?;
    }
    let elapsed = clock
        .now()
        .duration_since(started_at)
        .unwrap_or(Duration::ZERO);
    Ok(StreamReport {
        algorithm: stream.algorithm,
        emitted,
        skipped,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent<T> {
    Snapshot {
        algorithm: Algorithm,
        index: usize,
        values: Vec<T>,
    },
    Finished(StreamReport),
}

/// Observer that keeps every call it receives, in arrival order.
pub struct CollectingObserver<T> {
    events: Mutex<Vec<ObservedEvent<T>>>,
}

impl<T> Default for CollectingObserver<T> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> CollectingObserver<T> {
    pub fn events(&self) -> Vec<ObservedEvent<T>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(index, values)` pairs observed for one stream.
    pub fn snapshots_for(&self, algorithm: Algorithm) -> Vec<(usize, Vec<T>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Snapshot {
                    algorithm: seen,
                    index,
                    values,
                } if seen == algorithm => Some((index, values)),
                _ => None,
            })
            .collect()
    }
}

impl<T: Clone + Send> PlaybackObserver<T> for CollectingObserver<T> {
    fn on_snapshot(&self, algorithm: Algorithm, index: usize, snapshot: &Snapshot<T>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ObservedEvent::Snapshot {
                algorithm,
                index,
                values: snapshot.to_vec(),
            });
    }

    fn on_stream_finished(&self, report: &StreamReport) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ObservedEvent::Finished(report.clone()));
    }
}
