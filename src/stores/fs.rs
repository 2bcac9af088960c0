//! Filesystem-backed object store.
//!
//! Buckets map to directories under a fixed root; keys may contain `/` and
//! become nested paths. Chunk writes are atomic (temp file + rename) so a
//! crashed invocation never leaves a half-written chunk behind.

use crate::error::ExtractError;
use crate::request::DocumentLocation;
use crate::stores::ObjectStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, location: &DocumentLocation) -> PathBuf {
        self.root.join(&location.bucket).join(&location.key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Vec<u8>, ExtractError> {
        let path = self.object_path(location);
        debug!("reading object from {}", path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| ExtractError::DocumentFetch {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
                detail: format!("{e} ({})", path.display()),
            })
    }

    async fn put(&self, location: &DocumentLocation, bytes: Vec<u8>) -> Result<(), ExtractError> {
        let path = self.object_path(location);
        let chunk_write = |detail: String| ExtractError::ChunkWrite {
            key: location.to_string(),
            detail,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| chunk_write(e.to_string()))?;
        }

        // Atomic write: temp file in the same directory, then rename.
        let tmp_path = tmp_sibling(&path);
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| chunk_write(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| chunk_write(e.to_string()))?;

        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let location = DocumentLocation::new("out", "job-1/extracted/1-1.json");

        store.put(&location, b"{\"a\": 1}".to_vec()).await.unwrap();
        let bytes = store.get(&location).await.unwrap();
        assert_eq!(bytes, b"{\"a\": 1}");

        // No temp file left behind
        let dir_of = dir.path().join("out").join("job-1").join("extracted");
        let leftovers: Vec<_> = std::fs::read_dir(dir_of)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("1-1.json")]);
    }

    #[tokio::test]
    async fn get_of_missing_object_is_document_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store
            .get(&DocumentLocation::new("in", "nope.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentFetch { .. }));
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let location = DocumentLocation::new("out", "k.json");

        store.put(&location, b"old".to_vec()).await.unwrap();
        store.put(&location, b"new".to_vec()).await.unwrap();
        assert_eq!(store.get(&location).await.unwrap(), b"new");
    }
}
