//! Pipeline orchestration: the sequential batch loop.
//!
//! One invocation processes its batch plan strictly sequentially on one
//! logical task — no intra-invocation parallelism. Parallelism across
//! *invocations* is the external scheduler's job: it partitions a document
//! into disjoint ranges and invokes this pipeline once per range, and those
//! invocations share nothing but the two append/overwrite-style stores.
//!
//! Memory discipline: each batch's rendered images are dropped immediately
//! after the model call, before the next batch renders. Peak image memory is
//! therefore bounded per batch, not per document — a whole-document
//! invocation over hundreds of pages never holds more than one batch of
//! images.

use crate::accumulator::{Accumulator, BatchResult};
use crate::chunk;
use crate::config::{ConfigSummary, ExtractionConfig};
use crate::error::ExtractError;
use crate::output::{error_wire, ExtractionOutcome};
use crate::pipeline::{fetch, model::ExtractionModel, parse, render::Rasterizer};
use crate::planner::plan_batches;
use crate::prompts;
use crate::request::{resolve_request, ExtractionRequest};
use crate::stores::{JobStatusStore, ObjectStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// The external collaborators one invocation talks to.
///
/// Injected rather than constructed internally so tests can substitute
/// in-memory fakes for every seam.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ObjectStore>,
    pub status: Arc<dyn JobStatusStore>,
    pub model: Arc<dyn ExtractionModel>,
    pub rasterizer: Arc<dyn Rasterizer>,
}

/// Run one extraction invocation.
///
/// Fatal errors abort immediately with no chunk written. Recoverable
/// degradations (unparseable batch reply, failed status write) are absorbed
/// and surfaced as counters on the outcome.
pub async fn extract(
    request: &ExtractionRequest,
    deps: &Collaborators,
    config: &ExtractionConfig,
) -> Result<ExtractionOutcome, ExtractError> {
    info!(
        job_id = %request.job_id,
        document = %request.document,
        classification = %request.classification,
        config = ?ConfigSummary::from(config),
        "starting extraction"
    );

    // ── Step 1: Best-effort status transition ────────────────────────────
    let status_update_failed = match deps.status.mark_extracting(&request.job_id).await {
        Ok(()) => false,
        Err(e) => {
            warn!("{e}; continuing");
            true
        }
    };

    // ── Step 2: Fetch the document ───────────────────────────────────────
    let document = fetch::fetch_document(deps.store.as_ref(), &request.document).await?;

    // ── Step 3: Derive the page count ────────────────────────────────────
    // Done even for explicit-range invocations: it doubles as fail-fast
    // validation that the document is actually readable.
    let total_pages = deps.rasterizer.page_count(document.path()).await?;
    info!("document has {total_pages} pages");

    // ── Step 4: Plan batches ─────────────────────────────────────────────
    let plan = plan_batches(total_pages, request.pages, config.batch_width);
    let Some(&last_range) = plan.last() else {
        return Err(ExtractError::DocumentInfo {
            detail: "empty batch plan: document has no pages".to_string(),
        });
    };
    info!("processing {} batch(es), width {}", plan.len(), config.batch_width);

    // ── Step 5: Sequential batch fold ────────────────────────────────────
    let mut accumulator = Accumulator::new();
    let mut last_batch: Option<BatchResult> = None;
    let mut skipped_batches = 0usize;

    for range in &plan {
        info!("processing batch {range}");

        let images = deps.rasterizer.rasterize_range(document.path(), *range).await?;
        let pages: Vec<u32> = range.pages().collect();
        let instructions = prompts::extraction_instructions(
            &request.classification,
            &request.insurance_type,
            &pages,
            &accumulator.to_context_json(),
        );
        let parts = prompts::build_batch_parts(instructions, images);

        let reply = deps.model.extract(&range.to_string(), &parts).await?;
        // Release this batch's images before anything else happens; the
        // next iteration renders its own.
        drop(parts);

        match parse::parse_batch_reply(&reply) {
            Some(batch) => {
                accumulator = accumulator.merge(batch.clone());
                last_batch = Some(batch);
            }
            None => {
                warn!("batch {range}: reply contained no usable JSON, skipping");
                skipped_batches += 1;
            }
        }
    }

    info!(
        labels = accumulator.label_count(),
        skipped = skipped_batches,
        "batch loop complete"
    );

    // ── Step 6: Persist the chunk ────────────────────────────────────────
    // Body is the most recently processed batch's parsed result, not the
    // full accumulator — see DESIGN.md; `{}` when every batch was skipped.
    let body = last_batch.map(Value::Object).unwrap_or_else(|| {
        Value::Object(serde_json::Map::new())
    });
    let chunk_storage_key = chunk::persist_chunk(
        deps.store.as_ref(),
        &config.output_bucket,
        &request.job_id,
        last_range,
        &body,
    )
    .await?;

    Ok(ExtractionOutcome {
        pages: last_range,
        chunk_storage_key,
        batches_processed: plan.len(),
        skipped_batches,
        status_update_failed,
    })
}

/// Event-level entry point: decode the envelope, run the pipeline, and map
/// both outcomes to their wire forms. Never panics and never lets an error
/// escape undecoded.
pub async fn handle_event(
    event: &Value,
    deps: &Collaborators,
    config: &ExtractionConfig,
) -> Value {
    let request = match resolve_request(event) {
        Ok(request) => request,
        Err(e) => {
            warn!("{e}");
            return error_wire(&e.to_string());
        }
    };

    match extract(&request, deps, config).await {
        Ok(outcome) => outcome.to_wire(),
        Err(e) => {
            warn!(job_id = %request.job_id, "extraction failed: {e}");
            error_wire(&e.to_string())
        }
    }
}
