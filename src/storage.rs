//! Opaque keyed byte store for uploaded files.

use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the blob store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        /// Path involved in the failing operation.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem-backed blob store keyed by document id.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `root`, creating the directory when missing.
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Persist raw bytes under a key derived from the document id and type,
    /// returning the storage path.
    pub async fn save(
        &self,
        document_id: Uuid,
        file_type: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let key = if file_type.is_empty() {
            document_id.to_string()
        } else {
            format!("{document_id}.{file_type}")
        };
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(path.display().to_string())
    }

    /// Remove the stored bytes at `path`. Missing files are tolerated so that
    /// deletion stays idempotent.
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(Path::new(path)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_delete_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf()).expect("storage");
        let id = Uuid::new_v4();

        let path = storage.save(id, "txt", b"hello").await.expect("save");
        assert!(path.ends_with(&format!("{id}.txt")));
        let bytes = tokio::fs::read(&path).await.expect("read back");
        assert_eq!(bytes, b"hello");

        storage.delete(&path).await.expect("delete");
        storage.delete(&path).await.expect("second delete is a no-op");
    }

    #[tokio::test]
    async fn extensionless_uploads_use_bare_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf()).expect("storage");
        let id = Uuid::new_v4();

        let path = storage.save(id, "", b"data").await.expect("save");
        assert!(path.ends_with(&id.to_string()));
    }
}
