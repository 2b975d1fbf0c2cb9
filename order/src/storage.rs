//! Client-side key/value storage.

use std::io;
use std::path::{Path, PathBuf};

use cambio_common::{Classify, ErrorKind};
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Classify for StorageError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// String slots keyed by name, like browser local storage.
pub trait ClientStorage: Send + Sync {
    /// Read a slot.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a slot, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a slot and return what it held.
    fn remove(&self, key: &str) -> StorageResult<Option<String>>;
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.remove(key).map(|(_, v)| v))
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "File storage opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn missing_as_none<T>(result: io::Result<T>) -> StorageResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        missing_as_none(std::fs::read_to_string(path))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        let Some(value) = missing_as_none(std::fs::read_to_string(&path))? else {
            return Ok(None);
        };
        missing_as_none(std::fs::remove_file(&path))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn ClientStorage) {
        assert_eq!(storage.get("slot").unwrap(), None);

        storage.set("slot", "one").unwrap();
        storage.set("slot", "two").unwrap();
        assert_eq!(storage.get("slot").unwrap().as_deref(), Some("two"));

        assert_eq!(storage.remove("slot").unwrap().as_deref(), Some("two"));
        assert_eq!(storage.get("slot").unwrap(), None);
        assert_eq!(storage.remove("slot").unwrap(), None);
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        exercise(&storage);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("slots")).unwrap();

        exercise(&storage);
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get(""), Err(StorageError::InvalidKey(_))));
    }
}
