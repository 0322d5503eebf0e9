//! Durable key-value storage backends
//!
//! The history store persists through the [`KeyValueStorage`] trait so the
//! host can plug in whatever local storage it has. Two backends ship here:
//! an in-memory map (with an optional byte quota) and a directory of files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Synchronous string key-value storage
pub trait KeyValueStorage {
    /// Read the value stored under `key`, or `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, optionally limited to a total number of value bytes
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that rejects writes once values exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Change the quota; `None` removes the limit
    pub fn set_quota(&mut self, quota_bytes: Option<usize>) {
        self.quota_bytes = quota_bytes;
    }

    fn used_bytes_except(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let available = quota.saturating_sub(self.used_bytes_except(key));
            if value.len() > available {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    available,
                });
            }
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// File-backed storage: each key is stored as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a storage directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Point at a storage directory without touching the filesystem.
    ///
    /// Reads of a missing directory see no keys; writes fail until it exists.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write to a sibling then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_memory_storage_quota() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("a", "12345").unwrap();
        // Replacing a key only counts the new value
        storage.set("a", "1234567890").unwrap();

        let err = storage.set("b", "x").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 1,
                available: 0
            }
        ));
        assert_eq!(storage.get("b").unwrap(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path().join("data")).unwrap();

        assert_eq!(storage.get("bmi-history").unwrap(), None);

        storage.set("bmi-history", "[]").unwrap();
        assert!(dir.path().join("data/bmi-history.json").exists());
        assert_eq!(storage.get("bmi-history").unwrap().as_deref(), Some("[]"));

        storage.remove("bmi-history").unwrap();
        assert!(!dir.path().join("data/bmi-history.json").exists());
        storage.remove("bmi-history").unwrap();
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(matches!(
            storage.get("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.path_for("").is_err());
        assert!(storage.path_for(".hidden").is_err());
    }

    #[test]
    fn test_file_storage_at_does_not_create_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("missing");
        let mut storage = FileStorage::at(&data);

        assert_eq!(storage.get("bmi-history").unwrap(), None);
        assert!(!data.exists());
        assert!(matches!(
            storage.set("bmi-history", "[]"),
            Err(StorageError::Io(_))
        ));
    }
}
