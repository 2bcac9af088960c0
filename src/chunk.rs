//! Chunk persistence: write one invocation's result to object storage.
//!
//! Layout contract: one JSON object per invocation at
//! `{jobId}/extracted/{first}-{last}.json` in the output bucket. Keys never
//! collide across concurrent invocations of the same job because the
//! external scheduler hands each invocation a disjoint range.
//!
//! The body is written as-is; the persister does not validate its shape.

use crate::error::ExtractError;
use crate::planner::PageRange;
use crate::request::DocumentLocation;
use crate::stores::ObjectStore;
use serde_json::Value;
use tracing::info;

/// Storage key for a job's chunk covering `range`.
pub fn chunk_key(job_id: &str, range: PageRange) -> String {
    format!("{job_id}/extracted/{}-{}.json", range.first(), range.last())
}

/// Serialise `body` and write it to the output bucket. Returns the storage
/// key on success.
pub async fn persist_chunk(
    store: &dyn ObjectStore,
    output_bucket: &str,
    job_id: &str,
    range: PageRange,
    body: &Value,
) -> Result<String, ExtractError> {
    let key = chunk_key(job_id, range);
    let bytes = serde_json::to_vec(body).map_err(|e| ExtractError::ChunkWrite {
        key: key.clone(),
        detail: format!("serialisation: {e}"),
    })?;

    let location = DocumentLocation::new(output_bucket, key.clone());
    store.put(&location, bytes).await?;
    info!("persisted chunk {output_bucket}/{key}");
    Ok(key)
}
