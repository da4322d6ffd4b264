//! Durable local key/value storage.
//!
//! The storefront keeps a handful of strings per device profile (the anonymous
//! cart session id, the access token). [`LocalStore`] abstracts where they
//! live: [`FileStore`] persists a small JSON document on disk, [`MemoryStore`]
//! keeps them in the process.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::warn;

/// Storage keys shared by the storefront components.
pub mod keys {
    /// Anonymous cart session identifier.
    pub const CART_SESSION_ID: &str = "cart_session_id";

    /// Bearer access token of the signed-in customer.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Token exchanged for a new pair when the access token expires.
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Errors that can occur when reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entries could not be encoded for writing.
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// No durable location exists for this profile.
    #[error("no durable storage available: {0}")]
    Unavailable(&'static str),
}

/// Durable per-profile string storage.
pub trait LocalStore: Send + Sync + fmt::Debug {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FileStore
// =============================================================================

/// JSON-file backed store.
///
/// The file is re-read on every access, so two stores pointed at the same path
/// observe each other's writes (as two runs of the CLI do). Writes replace the
/// whole file through a temporary file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Platform default location (`<data dir>/bakery/storage.json`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("bakery").join("storage.json"))
    }

    /// Store at [`default_path`](Self::default_path).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the platform has no data
    /// directory.
    pub fn at_default_path() -> Result<Self, StorageError> {
        Self::default_path()
            .map(Self::new)
            .ok_or(StorageError::Unavailable("platform has no data directory"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries. An unparsable file reads as empty and is replaced
    /// by the next write.
    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&text) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Storage file is corrupt, starting from empty storage"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        if f(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|entries| entries.remove(key).is_some())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store.
///
/// Clones share the same entries, which lets tests simulate a restart by
/// building a second storefront over a clone of the first one's store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));

        other.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("storage.json"));
        assert_eq!(store.get(keys::CART_SESSION_ID).unwrap(), None);
        // Removing from a missing file must not create it
        store.remove(keys::CART_SESSION_ID).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        FileStore::new(&path).set(keys::CART_SESSION_ID, "sess_abc").unwrap();
        FileStore::new(&path).set(keys::ACCESS_TOKEN, "tok").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get(keys::CART_SESSION_ID).unwrap().as_deref(),
            Some("sess_abc")
        );
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("tok"));

        reopened.remove(keys::ACCESS_TOKEN).unwrap();
        assert_eq!(FileStore::new(&path).get(keys::ACCESS_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        for corrupt in [r#"{"cart_session_id": "sess_abc""#, "[1, 2, 3]"] {
            std::fs::write(&path, corrupt).unwrap();
            let store = FileStore::new(&path);

            assert_eq!(store.get(keys::CART_SESSION_ID).unwrap(), None);
            store.set(keys::CART_SESSION_ID, "sess_new").unwrap();
            assert_eq!(
                FileStore::new(&path).get(keys::CART_SESSION_ID).unwrap().as_deref(),
                Some("sess_new")
            );
        }
    }
}
