//! Blob storage abstraction and its filesystem implementation.
//!
//! Uploaded supplier files move through stage prefixes as the pipeline
//! advances: `incoming/` after upload, `processing/` during parsing,
//! then `approved/` or `rejected/` once the EAN analysis has decided.
//! The converted dataset lives next to the raw file as
//! `approved/{session_id}-data.json.gz`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use eanflow_core::types::DbId;

/// Stage prefix for freshly uploaded files.
pub const STAGE_INCOMING: &str = "incoming";
/// Stage prefix for files being parsed.
pub const STAGE_PROCESSING: &str = "processing";
/// Stage prefix for files that passed the EAN gate.
pub const STAGE_APPROVED: &str = "approved";
/// Stage prefix for files that failed the EAN gate.
pub const STAGE_REJECTED: &str = "rejected";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),
}

/// Result of a best-effort blob relocation.
///
/// Relocation failures after the payload has been safely read are
/// tolerated by the pipeline; the session simply keeps pointing at the
/// old path.
#[derive(Debug)]
pub enum MoveOutcome {
    Moved(String),
    Failed { reason: String },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Copy-then-delete relocation. Never fails the caller; a failure is
    /// reported through [`MoveOutcome::Failed`].
    async fn relocate(&self, from: &str, to: &str) -> MoveOutcome {
        let bytes = match self.download(from).await {
            Ok(bytes) => bytes,
            Err(err) => {
                return MoveOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        if let Err(err) = self.upload(to, &bytes).await {
            return MoveOutcome::Failed {
                reason: err.to_string(),
            };
        }
        if let Err(err) = self.delete(from).await {
            tracing::warn!(path = from, error = %err, "source blob left behind after move");
        }
        MoveOutcome::Moved(to.to_string())
    }
}

/// Build the storage path for a freshly uploaded file. A random prefix
/// keeps equal filenames from different uploads apart.
pub fn incoming_path(blob_id: uuid::Uuid, sanitized_filename: &str) -> String {
    format!("{STAGE_INCOMING}/{blob_id}/{sanitized_filename}")
}

/// Replace the stage prefix of a blob path, keeping the rest intact.
pub fn with_stage(path: &str, stage: &str) -> String {
    match path.split_once('/') {
        Some((_, rest)) => format!("{stage}/{rest}"),
        None => format!("{stage}/{path}"),
    }
}

/// Canonical location of the converted dataset for a session.
pub fn dataset_path(session_id: DbId) -> String {
    format!("{STAGE_APPROVED}/{session_id}-data.json.gz")
}

/// Read locations for a converted dataset, newest layout first. Older
/// deployments stored the dataset nested per session and without
/// compression; activation still accepts those.
pub fn dataset_read_paths(session_id: DbId) -> [String; 4] {
    [
        format!("{STAGE_APPROVED}/{session_id}-data.json.gz"),
        format!("{STAGE_APPROVED}/{session_id}/data.json.gz"),
        format!("{STAGE_APPROVED}/{session_id}-data.json"),
        format!("{STAGE_APPROVED}/{session_id}/data.json"),
    ]
}

/// Filesystem-backed blob store rooted at a configured directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative blob path under the root, rejecting anything
    /// that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&target)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_stage_swaps_only_the_prefix() {
        let path = "incoming/ab12/list.csv";
        assert_eq!(with_stage(path, STAGE_PROCESSING), "processing/ab12/list.csv");
        assert_eq!(with_stage(path, STAGE_APPROVED), "approved/ab12/list.csv");
    }

    #[test]
    fn dataset_read_paths_prefer_compressed_flat_layout() {
        let paths = dataset_read_paths(42);
        assert_eq!(paths[0], "approved/42-data.json.gz");
        assert!(paths.contains(&"approved/42/data.json".to_string()));
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.upload("incoming/x/a.csv", b"ean;name\n").await.unwrap();
        assert!(store.exists("incoming/x/a.csv").await.unwrap());
        assert_eq!(store.download("incoming/x/a.csv").await.unwrap(), b"ean;name\n");

        let err = store.download("incoming/x/missing.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn fs_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let err = store.download("../outside.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn relocate_moves_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.upload("incoming/y/b.csv", b"data").await.unwrap();

        match store.relocate("incoming/y/b.csv", "processing/y/b.csv").await {
            MoveOutcome::Moved(to) => assert_eq!(to, "processing/y/b.csv"),
            MoveOutcome::Failed { reason } => panic!("move failed: {reason}"),
        }
        assert!(!store.exists("incoming/y/b.csv").await.unwrap());
        assert!(store.exists("processing/y/b.csv").await.unwrap());
    }

    #[tokio::test]
    async fn relocate_missing_source_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        match store.relocate("incoming/nope.csv", "processing/nope.csv").await {
            MoveOutcome::Failed { reason } => assert!(reason.contains("not found")),
            MoveOutcome::Moved(_) => panic!("expected failure"),
        }
    }
}
