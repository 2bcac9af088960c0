//! Event resolution: decode and validate the invocation event.
//!
//! The pipeline is invoked with a structured event carrying the document's
//! storage location, the job identifier, classification metadata, and
//! optionally the page range an external scheduler assigned to this
//! invocation:
//!
//! ```json
//! {
//!   "detail": {
//!     "bucket": { "name": "submissions" },
//!     "object": { "key": "uploads/job-42/acme.pdf" }
//!   },
//!   "classification": {
//!     "jobId": "job-42",
//!     "classification": "MEDICAL_REPORT",
//!     "insuranceType": "life"
//!   },
//!   "pages": { "start": 4, "end": 6 }
//! }
//! ```
//!
//! Any missing or mistyped required field is fatal
//! ([`ExtractError::MalformedRequest`]) and aborts before any side effect —
//! no status write, no download.

use crate::error::ExtractError;
use crate::planner::PageRange;
use serde::{Deserialize, Serialize};

/// Location of an object in durable storage (bucket/key equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLocation {
    pub bucket: String,
    pub key: String,
}

impl DocumentLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// The validated input to one pipeline invocation. Constructed once by
/// [`resolve_request`]; immutable afterwards.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Where the source document lives.
    pub document: DocumentLocation,
    /// Job identifier keying the status table and the chunk storage prefix.
    pub job_id: String,
    /// Document-level classification assigned upstream (e.g. "MEDICAL_REPORT").
    pub classification: String,
    /// Insurance line (e.g. "life", "property_casualty").
    pub insurance_type: String,
    /// Range assigned by the external scheduler, if the document was
    /// pre-partitioned. None means process the whole document.
    pub pages: Option<PageRange>,
}

// ── Raw envelope ─────────────────────────────────────────────────────────
//
// Every field is optional at the serde level so that absence surfaces as a
// single uniform MalformedRequest instead of an opaque serde error naming
// internal struct paths.

#[derive(Debug, Deserialize)]
struct Envelope {
    detail: Option<Detail>,
    classification: Option<Classification>,
    pages: Option<RawRange>,
}

#[derive(Debug, Deserialize)]
struct Detail {
    bucket: Option<NamedBucket>,
    object: Option<KeyedObject>,
}

#[derive(Debug, Deserialize)]
struct NamedBucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyedObject {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
    classification: Option<String>,
    #[serde(rename = "insuranceType")]
    insurance_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    start: Option<u32>,
    end: Option<u32>,
}

fn missing(field: &str) -> ExtractError {
    ExtractError::MalformedRequest {
        detail: format!("missing field '{field}'"),
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, ExtractError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

/// Decode an invocation event into an [`ExtractionRequest`].
pub fn resolve_request(event: &serde_json::Value) -> Result<ExtractionRequest, ExtractError> {
    let envelope: Envelope =
        serde_json::from_value(event.clone()).map_err(|e| ExtractError::MalformedRequest {
            detail: format!("event is not a valid request envelope: {e}"),
        })?;

    let detail = envelope.detail.ok_or_else(|| missing("detail"))?;
    let bucket = require(
        detail.bucket.and_then(|b| b.name),
        "detail.bucket.name",
    )?;
    let key = require(detail.object.and_then(|o| o.key), "detail.object.key")?;

    let classification = envelope
        .classification
        .ok_or_else(|| missing("classification"))?;
    let job_id = require(classification.job_id, "classification.jobId")?;
    let doc_type = require(
        classification.classification,
        "classification.classification",
    )?;
    let insurance_type = require(
        classification.insurance_type,
        "classification.insuranceType",
    )?;

    let pages = match envelope.pages {
        None => None,
        Some(raw) => {
            let start = raw.start.ok_or_else(|| missing("pages.start"))?;
            let end = raw.end.ok_or_else(|| missing("pages.end"))?;
            let range = PageRange::new(start, end).ok_or_else(|| {
                ExtractError::MalformedRequest {
                    detail: format!(
                        "invalid page range {start}-{end}: need 1 ≤ start ≤ end"
                    ),
                }
            })?;
            Some(range)
        }
    };

    Ok(ExtractionRequest {
        document: DocumentLocation::new(bucket, key),
        job_id,
        classification: doc_type,
        insurance_type,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_event() -> serde_json::Value {
        json!({
            "detail": {
                "bucket": { "name": "submissions" },
                "object": { "key": "uploads/job-42/acme.pdf" }
            },
            "classification": {
                "jobId": "job-42",
                "classification": "MEDICAL_REPORT",
                "insuranceType": "life"
            },
            "pages": { "start": 4, "end": 6 }
        })
    }

    #[test]
    fn resolves_full_event() {
        let req = resolve_request(&full_event()).unwrap();
        assert_eq!(req.document.bucket, "submissions");
        assert_eq!(req.document.key, "uploads/job-42/acme.pdf");
        assert_eq!(req.job_id, "job-42");
        assert_eq!(req.classification, "MEDICAL_REPORT");
        assert_eq!(req.insurance_type, "life");
        assert_eq!(req.pages, PageRange::new(4, 6));
    }

    #[test]
    fn pages_is_optional() {
        let mut event = full_event();
        event.as_object_mut().unwrap().remove("pages");
        let req = resolve_request(&event).unwrap();
        assert!(req.pages.is_none());
    }

    #[test]
    fn missing_bucket_is_malformed() {
        let event = json!({
            "detail": { "object": { "key": "k" } },
            "classification": {
                "jobId": "j", "classification": "OTHER", "insuranceType": "life"
            }
        });
        let err = resolve_request(&event).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRequest { .. }));
        assert!(err.to_string().contains("detail.bucket.name"));
    }

    #[test]
    fn missing_job_id_is_malformed() {
        let event = json!({
            "detail": {
                "bucket": { "name": "b" },
                "object": { "key": "k" }
            },
            "classification": {
                "classification": "OTHER", "insuranceType": "life"
            }
        });
        let err = resolve_request(&event).unwrap_err();
        assert!(err.to_string().contains("classification.jobId"));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let mut event = full_event();
        event["classification"]["insuranceType"] = json!("  ");
        let err = resolve_request(&event).unwrap_err();
        assert!(err.to_string().contains("insuranceType"));
    }

    #[test]
    fn mistyped_field_is_malformed() {
        let mut event = full_event();
        event["classification"]["jobId"] = json!(42);
        let err = resolve_request(&event).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRequest { .. }));
    }

    #[test]
    fn inverted_range_is_malformed() {
        let mut event = full_event();
        event["pages"] = json!({ "start": 6, "end": 4 });
        let err = resolve_request(&event).unwrap_err();
        assert!(err.to_string().contains("6-4"));
    }

    #[test]
    fn zero_start_is_malformed() {
        let mut event = full_event();
        event["pages"] = json!({ "start": 0, "end": 4 });
        assert!(resolve_request(&event).is_err());
    }
}
