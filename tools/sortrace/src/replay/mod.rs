//! Race recording and replay.
//!
//! A recording is a JSONL file (one `RecordEntry` per line): a
//! `race_start` header carrying the input array, then every snapshot the
//! presentation layer saw, then one `stream_finished` per stream. Loading a
//! recording rebuilds both snapshot sequences so a race can be replayed
//! without sorting again.

pub mod recorder;
pub mod recording;
pub mod replayer;
