use std::path::{Path, PathBuf};

use strum::Display;
use tokio::fs;

/// Which side of a job a stored payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectRole {
    Input,
    Output,
    /// Dead-letter record written when a job fails permanently.
    Error,
}

/// Filesystem-backed store for job payloads, one file per `(id, role)` key.
///
/// Writes go to a temp file and are renamed into place, so a reader never
/// observes a partially written payload. Entries survive process restarts.
pub struct ObjectStore {
    base_path: PathBuf,
}

impl ObjectStore {
    pub async fn open(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn object_path(&self, id: &str, role: ObjectRole) -> PathBuf {
        self.base_path.join(format!("{}-{}.bin", id, role))
    }

    /// Store a payload under `(id, role)`. Each role is written at most once
    /// per job in normal operation, but overwrites are permitted.
    pub async fn save(
        &self,
        id: &str,
        role: ObjectRole,
        payload: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.object_path(id, role);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, payload).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Load the payload under `(id, role)`, or `None` if absent.
    pub async fn load(&self, id: &str, role: ObjectRole) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.object_path(id, role)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Destroy all stored payloads. Administrative/test use only.
    pub async fn clean(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.base_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("storage")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let (_dir, store) = temp_store().await;

        store.save("abc", ObjectRole::Input, b"payload").await.unwrap();
        let loaded = store.load("abc", ObjectRole::Input).await.unwrap();

        assert_eq!(loaded.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn roles_are_independent_keys() {
        let (_dir, store) = temp_store().await;

        store.save("abc", ObjectRole::Input, b"in").await.unwrap();

        assert!(store.load("abc", ObjectRole::Output).await.unwrap().is_none());
        assert!(store.load("abc", ObjectRole::Error).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_none_not_error() {
        let (_dir, store) = temp_store().await;

        assert!(store.load("xyz", ObjectRole::Input).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clean_resets_to_empty() {
        let (_dir, store) = temp_store().await;

        store.save("abc", ObjectRole::Input, b"in").await.unwrap();
        store.clean().await.unwrap();

        assert!(store.load("abc", ObjectRole::Input).await.unwrap().is_none());

        // Store is usable again after clean.
        store.save("def", ObjectRole::Input, b"in2").await.unwrap();
        assert!(store.load("def", ObjectRole::Input).await.unwrap().is_some());
    }
}
