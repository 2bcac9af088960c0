//! HTTP-backed stores for REST-style endpoints.
//!
//! Objects live at `{endpoint}/{bucket}/{key}`; GET downloads, PUT uploads.
//! Works against anything speaking the path-style S3 dialect (MinIO,
//! localstack, a plain file server for reads). Job-status rows follow the
//! same dialect at `{endpoint}/{table}/{jobId}`. Authentication is the
//! endpoint's concern — presigned or proxy-fronted URLs keep credentials out
//! of this crate.

use crate::error::{ExtractError, StatusUpdateError};
use crate::request::DocumentLocation;
use crate::stores::{JobStatusStore, ObjectStore};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ExtractError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))
}

pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpObjectStore {
    /// Create a store against `endpoint` (scheme + host, no trailing slash
    /// required) with the given per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ExtractError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, location: &DocumentLocation) -> String {
        format!("{}/{}/{}", self.endpoint, location.bucket, location.key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Vec<u8>, ExtractError> {
        let url = self.object_url(location);
        debug!("GET {url}");

        let fetch_err = |detail: String| ExtractError::DocumentFetch {
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            detail,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, location: &DocumentLocation, bytes: Vec<u8>) -> Result<(), ExtractError> {
        let url = self.object_url(location);
        debug!("PUT {url} ({} bytes)", bytes.len());

        let write_err = |detail: String| ExtractError::ChunkWrite {
            key: location.to_string(),
            detail,
        };

        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| write_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(write_err(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

/// [`JobStatusStore`] against the same path-style dialect: the job row lives
/// at `{endpoint}/{table}/{jobId}` and is replaced wholesale on update.
///
/// The table identifier comes from configuration:
///
/// ```rust,no_run
/// use uwextract::{ExtractionConfig, HttpStatusStore};
/// # fn main() -> Result<(), uwextract::ExtractError> {
/// let config = ExtractionConfig::from_env()?;
/// let status = HttpStatusStore::new("http://localhost:9000", &config.jobs_table, 10)?;
/// # Ok(())
/// # }
/// ```
pub struct HttpStatusStore {
    client: reqwest::Client,
    endpoint: String,
    table: String,
}

impl HttpStatusStore {
    pub fn new(
        endpoint: impl Into<String>,
        table: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            table: table.into(),
        })
    }

    fn row_url(&self, job_id: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.table, job_id)
    }
}

#[async_trait]
impl JobStatusStore for HttpStatusStore {
    async fn mark_extracting(&self, job_id: &str) -> Result<(), StatusUpdateError> {
        let url = self.row_url(job_id);
        debug!("PUT {url}");

        let status_err = |detail: String| StatusUpdateError {
            job_id: job_id.to_string(),
            detail,
        };

        let body = serde_json::json!({
            "status": "EXTRACTING",
            "extractionStartedAt": Utc::now().to_rfc3339(),
        });
        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| status_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_err(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_joins_endpoint_bucket_key() {
        let store = HttpObjectStore::new("http://localhost:9000/", 5).unwrap();
        let url = store.object_url(&DocumentLocation::new("out", "job-1/extracted/1-1.json"));
        assert_eq!(url, "http://localhost:9000/out/job-1/extracted/1-1.json");
    }

    #[test]
    fn row_url_joins_endpoint_table_job() {
        let store = HttpStatusStore::new("http://localhost:9000/", "uw-jobs", 5).unwrap();
        assert_eq!(store.row_url("job-42"), "http://localhost:9000/uw-jobs/job-42");
    }
}
