//! External storage collaborators.
//!
//! The pipeline never talks to concrete storage directly: it is handed a
//! [`ObjectStore`] (durable document/chunk storage) and a [`JobStatusStore`]
//! (job-status key-value table) at the entry point. That keeps the core loop
//! testable with in-memory fakes and lets deployments pick their backend —
//! a local directory, an S3-compatible HTTP endpoint, or whatever else
//! implements the traits.
//!
//! Key-collision note: concurrent invocations over disjoint ranges of the
//! same job write to distinct chunk keys and the same status row; neither
//! store needs coordination beyond last-write-wins.

mod fs;
mod http;
mod memory;

pub use fs::FsObjectStore;
pub use http::{HttpObjectStore, HttpStatusStore};
pub use memory::{JobStatusRow, MemoryObjectStore, MemoryStatusStore};

use crate::error::{ExtractError, StatusUpdateError};
use crate::request::DocumentLocation;
use async_trait::async_trait;

/// Durable object storage: document download and chunk upload.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes. Failure maps to
    /// [`ExtractError::DocumentFetch`] — fatal for the invocation.
    async fn get(&self, location: &DocumentLocation) -> Result<Vec<u8>, ExtractError>;

    /// Write an object, overwriting any existing one. Failure maps to
    /// [`ExtractError::ChunkWrite`] — fatal for the invocation.
    async fn put(&self, location: &DocumentLocation, bytes: Vec<u8>) -> Result<(), ExtractError>;
}

/// Job-status table keyed by job identifier.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Set `status = "EXTRACTING"` plus an extraction-start timestamp for
    /// the job. Best-effort: the caller logs a failure and continues.
    async fn mark_extracting(&self, job_id: &str) -> Result<(), StatusUpdateError>;
}
