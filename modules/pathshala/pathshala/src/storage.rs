//! Durable key/value storage for tokens and the cached subdomain.

use parking_lot::Mutex;
use pathshala_sdk::PathshalaError;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys written by the client.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER_NAME: &str = "user_name";
    pub const SUBDOMAIN: &str = "pathshala_subdomain";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StorageError> for PathshalaError {
    fn from(err: StorageError) -> Self {
        PathshalaError::Storage(err.to_string())
    }
}

/// Last-write-wins string storage.
pub trait ClientStorage: Send + Sync {
    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk. Every write replaces the file through a sibling
/// temp file and a rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// # Errors
    /// Returns `StorageError` if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| StorageError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened client storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let raw = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, raw).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);

        storage.set(keys::ACCESS_TOKEN, "a-1").unwrap();
        storage.set(keys::ACCESS_TOKEN, "a-2").unwrap();
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("a-2"));

        storage.remove(keys::ACCESS_TOKEN).unwrap();
        storage.remove(keys::ACCESS_TOKEN).unwrap();
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
    }

    #[test]
    fn file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set(keys::SUBDOMAIN, "vk-learnings").unwrap();
        storage.set(keys::REFRESH_TOKEN, "r-1").unwrap();
        storage.remove(keys::REFRESH_TOKEN).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get(keys::SUBDOMAIN).unwrap().as_deref(),
            Some("vk-learnings")
        );
        assert_eq!(reopened.get(keys::REFRESH_TOKEN).unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn empty_file_opens_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let storage = FileStorage::open(file.path()).unwrap();
        assert_eq!(storage.get(keys::USER_NAME).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not json").unwrap();
        let err = FileStorage::open(file.path()).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let converted: PathshalaError = err.into();
        assert!(converted.message().starts_with("storage error"));
    }
}
