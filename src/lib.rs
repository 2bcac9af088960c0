//! # uwextract
//!
//! Extract structured data from multi-page scanned insurance underwriting
//! submissions using vision language models.
//!
//! ## Why this crate?
//!
//! Underwriting submissions are heterogeneous bundles — applications,
//! attending physician statements, lab panels, financial statements — scanned
//! into one PDF with no machine-readable structure. Classical OCR gives you
//! text soup. Instead this crate rasterises pages in small batches and lets a
//! vision model read each page as an underwriter would: classifying it into a
//! sub-document type and extracting every key-value pair, while the running
//! analysis is carried forward so groupings stay consistent across batches.
//!
//! ## Pipeline Overview
//!
//! ```text
//! event
//!  │
//!  ├─ 1. Resolve  validate the request envelope
//!  ├─ 2. Fetch    download the document from object storage
//!  ├─ 3. Plan     fixed-width page ranges (or the scheduler's explicit range)
//!  ├─ 4. Loop     per batch, sequentially:
//!  │      render → normalise → prompt (+ prior context) → model → parse → merge
//!  └─ 5. Persist  one JSON chunk at {jobId}/extracted/{first}-{last}.json
//! ```
//!
//! Batches are processed strictly sequentially within an invocation; an
//! external scheduler may fan out disjoint ranges of the same document as
//! concurrent invocations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uwextract::{
//!     handle_event, Collaborators, ExtractionConfig, FsObjectStore,
//!     MemoryStatusStore, PdfiumRasterizer, VisionModel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::from_env()?;
//!     let deps = Collaborators {
//!         store: Arc::new(FsObjectStore::new("./store")),
//!         status: Arc::new(MemoryStatusStore::new()),
//!         model: Arc::new(VisionModel::from_config(&config)?),
//!         rasterizer: Arc::new(PdfiumRasterizer::new((&config).into())),
//!     };
//!     let event = serde_json::json!({
//!         "detail": {
//!             "bucket": { "name": "submissions" },
//!             "object": { "key": "uploads/job-42/acme.pdf" }
//!         },
//!         "classification": {
//!             "jobId": "job-42",
//!             "classification": "MEDICAL_REPORT",
//!             "insuranceType": "life"
//!         }
//!     });
//!     let result = handle_event(&event, &deps, &config).await;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Malformed request, document fetch/info, rasterisation, and model errors
//! are fatal: the invocation aborts with a structured error and writes
//! nothing. An unparseable model reply or a failed job-status write degrades
//! the result (skipped batch, flag on the outcome) without aborting.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `uwextract` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod accumulator;
pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod request;
pub mod stores;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use accumulator::{Accumulator, BatchResult};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ExtractError, StatusUpdateError};
pub use extract::{extract, handle_event, Collaborators};
pub use output::ExtractionOutcome;
pub use pipeline::model::{ExtractionModel, VisionModel};
pub use pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer, RenderOptions};
pub use planner::{plan_batches, PageRange};
pub use request::{resolve_request, DocumentLocation, ExtractionRequest};
pub use stores::{
    FsObjectStore, HttpObjectStore, HttpStatusStore, JobStatusStore, MemoryObjectStore,
    MemoryStatusStore, ObjectStore,
};
