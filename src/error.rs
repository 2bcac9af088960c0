//! Error types for the uwextract library.
//!
//! Two distinct error types reflect the two failure policies of the pipeline:
//!
//! * [`ExtractError`] — **Fatal**: the invocation cannot proceed (malformed
//!   event, unreadable document, rendering failure, model API failure).
//!   Returned as `Err(ExtractError)` from [`crate::extract::extract`] with no
//!   partial chunk written.
//!
//! * [`StatusUpdateError`] — **Recoverable**: the best-effort job-status write
//!   failed. Logged and reflected in
//!   [`crate::output::ExtractionOutcome::status_update_failed`]; the run
//!   continues.
//!
//! A third recoverable condition — a model reply with no parseable JSON — has
//! no error type at all: the response parser returns `None` and the batch is
//! counted in [`crate::output::ExtractionOutcome::skipped_batches`]. One
//! formatting hiccup must not abort a multi-hundred-page run.

use thiserror::Error;

/// All fatal errors returned by the extraction pipeline.
///
/// Every variant aborts the invocation immediately; the caller-facing wire
/// form is `{ "status": "ERROR", "message": <Display output> }` (see
/// [`crate::extract::handle_event`]).
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required field of the invocation event is absent or mistyped.
    #[error("Malformed request: {detail}")]
    MalformedRequest { detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The source document could not be downloaded from object storage.
    #[error("Failed to fetch document '{key}' from bucket '{bucket}': {detail}")]
    DocumentFetch {
        bucket: String,
        key: String,
        detail: String,
    },

    /// The document was fetched but its page count could not be derived
    /// (corrupt file, not a PDF, rasterizer could not open it).
    #[error("Failed to read document info: {detail}")]
    DocumentInfo { detail: String },

    /// Rendering a page to an image failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Rasterization { page: u32, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured model provider is not available (missing API key etc.).
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The multimodal model invocation failed. Deliberately not retried:
    /// one failure kills the whole run.
    #[error("Model invocation failed for pages {pages}: {detail}")]
    ModelInvocation { pages: String, detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The result chunk could not be written to object storage.
    #[error("Failed to write chunk '{key}': {detail}")]
    ChunkWrite { key: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked blocking task, temp-file I/O).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable failure of the best-effort job-status write.
///
/// Never propagated out of the pipeline; the orchestrator logs it and sets a
/// flag on the outcome so callers still get a signal for observability.
#[derive(Debug, Clone, Error)]
#[error("Status update failed for job '{job_id}': {detail}")]
pub struct StatusUpdateError {
    pub job_id: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_display() {
        let e = ExtractError::MalformedRequest {
            detail: "missing field 'jobId'".into(),
        };
        assert!(e.to_string().contains("jobId"), "got: {e}");
    }

    #[test]
    fn rasterization_display_names_page() {
        let e = ExtractError::Rasterization {
            page: 7,
            detail: "bitmap allocation failed".into(),
        };
        assert!(e.to_string().contains("page 7"));
    }

    #[test]
    fn model_invocation_display_names_pages() {
        let e = ExtractError::ModelInvocation {
            pages: "4-6".into(),
            detail: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("4-6"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn status_update_error_display() {
        let e = StatusUpdateError {
            job_id: "job-1".into(),
            detail: "table unavailable".into(),
        };
        assert!(e.to_string().contains("job-1"));
    }
}
