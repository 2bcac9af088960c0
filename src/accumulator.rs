//! Cross-batch result aggregation.
//!
//! The model replies with one JSON object per batch, mapping a sub-document
//! type label (e.g. "Lab Results") to a list of per-page records. The
//! [`Accumulator`] carries those groupings forward across batches so the
//! model can keep labels consistent, and the merge is a pure
//! `merge(accumulator, batch) → accumulator` fold over the sequential batch
//! loop — no shared mutable state, no locking.
//!
//! Records are opaque beyond their page number: the pipeline appends them in
//! processing order and performs no deduplication. If the model emits the
//! same page twice, both records are kept — downstream consumers decide what
//! duplicate pages mean.
//!
//! Labels keep first-seen order in the carried-forward context (serde_json's
//! `preserve_order` feature), so the prompt the model sees reflects the order
//! it introduced the groupings in, not an alphabetical reshuffle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// One batch's parsed model reply: sub-document label → page records.
pub type BatchResult = Map<String, Value>;

/// The running cross-batch grouping of extracted page records.
///
/// Invariant: every value in `groups` is a `Value::Array`; `merge` rejects
/// anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accumulator {
    groups: Map<String, Value>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct sub-document labels seen so far.
    pub fn label_count(&self) -> usize {
        self.groups.len()
    }

    /// Records accumulated under a label, in processing order.
    pub fn records(&self, label: &str) -> Option<&[Value]> {
        self.groups
            .get(label)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// Fold one batch result into the accumulator.
    ///
    /// For every label in the batch, its record list is appended to the
    /// existing list under that label (creating the label if new). A value
    /// that is not a list cannot be grouped and is skipped with a warning
    /// rather than failing the batch.
    pub fn merge(mut self, batch: BatchResult) -> Self {
        for (label, value) in batch {
            match value {
                Value::Array(records) => match self.groups.get_mut(&label) {
                    Some(Value::Array(existing)) => existing.extend(records),
                    _ => {
                        self.groups.insert(label, Value::Array(records));
                    }
                },
                other => {
                    warn!(label = %label, "batch value is not a list, skipping: {other}");
                }
            }
        }
        self
    }

    /// Serialise the accumulator for embedding in the next batch's prompt.
    ///
    /// The first batch sees `{}` — an empty prior-analysis context.
    pub fn to_context_json(&self) -> String {
        if self.groups.is_empty() {
            return "{}".to_string();
        }
        serde_json::to_string_pretty(&self.groups).unwrap_or_else(|_| "{}".to_string())
    }

    /// The full accumulated result as a JSON value.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.groups.clone())
    }
}
