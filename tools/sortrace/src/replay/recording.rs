//! Serializable types for race recordings.

use crate::input::{Distribution, SizePolicy};
use crate::snapshot::Value;
use crate::sort::Algorithm;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceStartRecord {
    /// `None` when the input did not come from the provisioner.
    pub distribution: Option<Distribution>,
    pub size: Option<SizePolicy>,
    pub input: Vec<Value>,
    /// `<hash:sha256:XXXXXXXXXXXXXXXX>` over the input, see [`input_digest`].
    pub input_digest: String,
    pub recorded_at_unix_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub algorithm: Algorithm,
    pub index: usize,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFinishedRecord {
    pub algorithm: Algorithm,
    pub elapsed_ms: u64,
    pub emitted: usize,
}

/// One JSONL line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEntry {
    RaceStart(RaceStartRecord),
    Snapshot(SnapshotRecord),
    StreamFinished(StreamFinishedRecord),
}

/// Short fingerprint of an input array: the first 8 bytes of SHA-256 over
/// its comma-separated decimal rendering.
pub fn input_digest(values: &[Value]) -> String {
    let rendered = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let hash = Sha256::digest(rendered.as_bytes());
    let prefix = hash[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    format!("<hash:sha256:{prefix}>")
}

#[cfg(test)]
mod tests {
    use super::{input_digest, RecordEntry, SnapshotRecord};
    use crate::sort::Algorithm;

    #[test]
    fn entries_are_tagged_by_type() {
        let entry = RecordEntry::Snapshot(SnapshotRecord {
            algorithm: Algorithm::Mergesort,
            index: 3,
            values: vec![1, 2],
        });
        let line = serde_json::to_string(&entry).expect("json");
        assert_eq!(
            line,
            r#"{"type":"snapshot","algorithm":"mergesort","index":3,"values":[1,2]}"#
        );
    }

    #[test]
    fn digest_is_stable_and_order_sensitive() {
        let a = input_digest(&[1, 2, 3]);
        assert_eq!(a, input_digest(&[1, 2, 3]));
        assert_ne!(a, input_digest(&[3, 2, 1]));
        assert!(a.starts_with("<hash:sha256:"));
        assert_eq!(a.len(), "<hash:sha256:>".len() + 16);
    }
}
