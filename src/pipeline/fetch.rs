//! Document fetch: download from object storage to a local temp file.
//!
//! pdfium needs a file-system path — it cannot stream from a byte buffer.
//! Downloading into a `TempDir` gives us a path pdfium can open while
//! ensuring cleanup happens automatically when [`FetchedDocument`] is
//! dropped, even on panic. The `%PDF` magic bytes are validated before
//! returning so callers get a meaningful error instead of a pdfium crash on
//! a mis-uploaded object.

use crate::error::ExtractError;
use crate::request::DocumentLocation;
use crate::stores::ObjectStore;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A document downloaded to local disk. The backing `TempDir` is kept alive
/// until processing completes.
#[derive(Debug)]
pub struct FetchedDocument {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl FetchedDocument {
    /// Local path of the downloaded file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Download `location` to a temp file and validate it is a PDF.
pub async fn fetch_document(
    store: &dyn ObjectStore,
    location: &DocumentLocation,
) -> Result<FetchedDocument, ExtractError> {
    info!("fetching document {location}");
    let bytes = store.get(location).await?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(ExtractError::DocumentInfo {
            detail: format!(
                "object '{location}' is not a PDF (first bytes: {:?})",
                &bytes[..bytes.len().min(4)]
            ),
        });
    }

    let temp_dir =
        TempDir::new().map_err(|e| ExtractError::Internal(format!("temp dir: {e}")))?;
    let filename = safe_filename(&location.key);
    let path = temp_dir.path().join(filename);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("temp file write: {e}")))?;

    debug!("document staged at {} ({} bytes)", path.display(), bytes.len());
    Ok(FetchedDocument {
        path,
        _temp_dir: temp_dir,
    })
}

/// Final path component of the object key, with a fallback for odd keys.
fn safe_filename(key: &str) -> String {
    let name = key.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        "document.pdf".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryObjectStore;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";

    #[tokio::test]
    async fn fetch_stages_pdf_in_temp_dir() {
        let store = MemoryObjectStore::new();
        let location = DocumentLocation::new("in", "uploads/job-1/acme.pdf");
        store.insert(location.clone(), MINIMAL_PDF.to_vec());

        let doc = fetch_document(&store, &location).await.unwrap();
        assert!(doc.path().exists());
        assert_eq!(doc.path().file_name().unwrap(), "acme.pdf");
        assert_eq!(std::fs::read(doc.path()).unwrap(), MINIMAL_PDF);
    }

    #[tokio::test]
    async fn temp_file_is_removed_on_drop() {
        let store = MemoryObjectStore::new();
        let location = DocumentLocation::new("in", "a.pdf");
        store.insert(location.clone(), MINIMAL_PDF.to_vec());

        let doc = fetch_document(&store, &location).await.unwrap();
        let path = doc.path().to_path_buf();
        drop(doc);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_document_info_error() {
        let store = MemoryObjectStore::new();
        let location = DocumentLocation::new("in", "notes.txt");
        store.insert(location.clone(), b"hello world".to_vec());

        let err = fetch_document(&store, &location).await.unwrap_err();
        assert!(matches!(err, ExtractError::DocumentInfo { .. }));
    }

    #[tokio::test]
    async fn missing_object_propagates_fetch_error() {
        let store = MemoryObjectStore::new();
        let err = fetch_document(&store, &DocumentLocation::new("in", "gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentFetch { .. }));
    }

    #[test]
    fn safe_filename_handles_nested_and_odd_keys() {
        assert_eq!(safe_filename("uploads/j/acme.pdf"), "acme.pdf");
        assert_eq!(safe_filename("flat.pdf"), "flat.pdf");
        assert_eq!(safe_filename("trailing/"), "document.pdf");
    }
}
