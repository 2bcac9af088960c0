//! In-memory store implementations for testing and development.
//!
//! Data is lost on drop; not for production. The object store doubles as the
//! standard fixture for pipeline tests: seed a document, run an invocation,
//! assert on the persisted chunk.

use crate::error::{ExtractError, StatusUpdateError};
use crate::request::DocumentLocation;
use crate::stores::{JobStatusStore, ObjectStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory [`ObjectStore`].
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<DocumentLocation, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object synchronously (test setup).
    pub fn insert(&self, location: DocumentLocation, bytes: Vec<u8>) {
        self.objects.write().unwrap().insert(location, bytes);
    }

    /// Read an object synchronously (test assertions).
    pub fn object(&self, location: &DocumentLocation) -> Option<Vec<u8>> {
        self.objects.read().unwrap().get(location).cloned()
    }

    /// All stored keys, for asserting nothing unexpected was written.
    pub fn keys(&self) -> Vec<DocumentLocation> {
        self.objects.read().unwrap().keys().cloned().collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Vec<u8>, ExtractError> {
        self.objects
            .read()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or_else(|| ExtractError::DocumentFetch {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
                detail: "no such object".to_string(),
            })
    }

    async fn put(&self, location: &DocumentLocation, bytes: Vec<u8>) -> Result<(), ExtractError> {
        self.objects
            .write()
            .unwrap()
            .insert(location.clone(), bytes);
        Ok(())
    }
}

/// One row of the in-memory status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusRow {
    pub status: String,
    pub extraction_started_at: DateTime<Utc>,
}

/// In-memory [`JobStatusStore`].
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: RwLock<HashMap<String, JobStatusRow>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, job_id: &str) -> Option<JobStatusRow> {
        self.rows.read().unwrap().get(job_id).cloned()
    }
}

#[async_trait]
impl JobStatusStore for MemoryStatusStore {
    async fn mark_extracting(&self, job_id: &str) -> Result<(), StatusUpdateError> {
        let row = JobStatusRow {
            status: "EXTRACTING".to_string(),
            extraction_started_at: Utc::now(),
        };
        self.rows.write().unwrap().insert(job_id.to_string(), row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn object_store_round_trips() {
        let store = MemoryObjectStore::new();
        let location = DocumentLocation::new("b", "k");
        store.put(&location, vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get(&location).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn missing_object_is_document_fetch() {
        let store = MemoryObjectStore::new();
        let err = store
            .get(&DocumentLocation::new("b", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentFetch { .. }));
    }

    #[tokio::test]
    async fn mark_extracting_records_status_and_timestamp() {
        let store = MemoryStatusStore::new();
        store.mark_extracting("job-1").await.unwrap();
        let row = store.row("job-1").unwrap();
        assert_eq!(row.status, "EXTRACTING");
        assert!(Utc::now() >= row.extraction_started_at);
    }
}
