//! # Saved State
//!
//! Best-effort local persistence of the latest snapshot, keyed by
//! document identity. Absent or corrupt values read back as "no saved
//! state"; write failures surface as `StorageError` for the caller to
//! turn into a notification.

use crate::history::Snapshot;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Namespace of persisted editor state
pub const STATE_KEY_PREFIX: &str = "vellum:state:";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Quota exceeded writing {key} ({bytes} bytes)")]
    QuotaExceeded { key: String, bytes: usize },
}

/// Minimal string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store with an optional byte quota over all values
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: HashMap::new(),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn used_without(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            if self.used_without(key) + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: value.len(),
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

/// One `.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Keys become file names: anything outside `[A-Za-z0-9_-]` maps to `_`
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn state_key(document_id: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, document_id)
}

/// Read the saved snapshot for a document. Read failures and corrupt
/// values are logged and treated as absent.
pub fn load_saved_state(store: &dyn KeyValueStore, document_id: &str) -> Option<Snapshot> {
    let key = state_key(document_id);
    let raw = match store.get(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read saved state");
            return None;
        }
    };
    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring corrupt saved state");
            None
        }
    }
}

pub fn save_state(
    store: &mut dyn KeyValueStore,
    document_id: &str,
    snapshot: &Snapshot,
) -> Result<(), StorageError> {
    let key = state_key(document_id);
    let value = serde_json::to_string(snapshot)?;
    store.set(&key, &value)?;
    debug!(key = %key, bytes = value.len(), "Saved state");
    Ok(())
}

pub fn discard_state(store: &mut dyn KeyValueStore, document_id: &str) -> Result<(), StorageError> {
    store.remove(&state_key(document_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let mut colors = BTreeMap::new();
        colors.insert("--fg".to_string(), "#112233".to_string());
        Snapshot::new("<p>saved</p>", colors)
    }

    #[test]
    fn test_memory_roundtrip() {
        let mut store = MemoryStore::new();
        save_state(&mut store, "abc", &snapshot()).unwrap();
        assert_eq!(load_saved_state(&store, "abc"), Some(snapshot()));
        assert!(store.get("vellum:state:abc").unwrap().unwrap().contains("\"bodyMarkup\""));
        assert!(load_saved_state(&store, "other").is_none());
    }

    #[test]
    fn test_corrupt_value_is_absent() {
        let mut store = MemoryStore::new();
        store.set(&state_key("abc"), "{not json").unwrap();
        assert!(load_saved_state(&store, "abc").is_none());
    }

    #[test]
    fn test_quota_exceeded() {
        let mut store = MemoryStore::with_quota(10);
        let err = save_state(&mut store, "abc", &snapshot()).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("state")).unwrap();
        save_state(&mut store, "abc", &snapshot()).unwrap();
        assert!(dir.path().join("state/vellum_state_abc.json").exists());
        assert_eq!(load_saved_state(&store, "abc"), Some(snapshot()));

        discard_state(&mut store, "abc").unwrap();
        assert!(load_saved_state(&store, "abc").is_none());
        // Removing twice is fine
        discard_state(&mut store, "abc").unwrap();
    }
}
