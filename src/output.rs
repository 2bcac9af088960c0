//! Invocation results and their wire forms.
//!
//! A successful invocation reports the range it processed and where the
//! chunk landed, plus counters for the recoverable degradations that were
//! absorbed along the way (skipped batches, failed status write) — absorbed
//! silently at the pipeline level, but never invisibly.

use crate::planner::PageRange;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outcome of one successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// The last-processed page range; for explicit-range invocations this is
    /// the assigned range itself.
    pub pages: PageRange,
    /// Storage key of the persisted chunk within the output bucket.
    pub chunk_storage_key: String,
    /// Total batches the plan contained.
    pub batches_processed: usize,
    /// Batches whose reply yielded no usable JSON and contributed nothing.
    pub skipped_batches: usize,
    /// True when the best-effort job-status write failed.
    pub status_update_failed: bool,
}

impl ExtractionOutcome {
    /// Success wire form:
    /// `{ "pages": {"start","end"}, "chunkStorageKey", ... }`.
    pub fn to_wire(&self) -> Value {
        json!({
            "pages": self.pages,
            "chunkStorageKey": self.chunk_storage_key,
            "batchesProcessed": self.batches_processed,
            "skippedBatches": self.skipped_batches,
        })
    }
}

/// Failure wire form: `{ "status": "ERROR", "message": <cause> }`.
pub fn error_wire(message: &str) -> Value {
    json!({
        "status": "ERROR",
        "message": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_wire_form() {
        let outcome = ExtractionOutcome {
            pages: PageRange::new(5, 5).unwrap(),
            chunk_storage_key: "job-1/extracted/5-5.json".into(),
            batches_processed: 1,
            skipped_batches: 0,
            status_update_failed: false,
        };
        let wire = outcome.to_wire();
        assert_eq!(wire["pages"]["start"], 5);
        assert_eq!(wire["pages"]["end"], 5);
        assert_eq!(wire["chunkStorageKey"], "job-1/extracted/5-5.json");
        assert_eq!(wire["batchesProcessed"], 1);
        assert!(wire.get("status").is_none());
    }

    #[test]
    fn error_wire_form() {
        let wire = error_wire("Malformed request: missing field 'jobId'");
        assert_eq!(wire["status"], "ERROR");
        assert!(wire["message"].as_str().unwrap().contains("jobId"));
    }
}
