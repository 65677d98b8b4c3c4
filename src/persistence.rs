//! Key-value snapshot persistence.
//!
//! Each store serialises its whole state as one JSON snapshot under a fixed
//! namespace key. Loads happen once at startup; saves after every mutation.
//! Failures are logged and swallowed by `load_snapshot` / `save_snapshot`:
//! the in-memory state stays authoritative for the running process.

use std::{
    collections::HashMap,
    fs,
    path::{Component, Path, PathBuf},
    sync::Mutex,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;

pub const PROGRESS_NAMESPACE: &str = "uml-learning-progress";
pub const ACHIEVEMENTS_NAMESPACE: &str = "uml-learning-achievements";

/// Storage key for one learner's namespace, e.g. `alice/uml-learning-progress`.
pub fn learner_key(learner: &str, namespace: &str) -> String {
    format!("{}/{}", learner, namespace)
}

pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn save(&self, key: &str, snapshot: &str) -> Result<(), PersistenceError>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, snapshot: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        entries.insert(key.to_string(), snapshot.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key below a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys come from request paths; only plain relative segments are allowed.
    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let rel = Path::new(key);
        let plain = !key.is_empty()
            && !key.contains('\\')
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, snapshot: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Readers never observe a partially written snapshot.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Load and decode a snapshot. Missing, unreadable or corrupt snapshots
/// yield `T::default()`.
pub fn load_snapshot<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.load(key) {
        Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
            Ok(v) => {
                debug!(target: "uml_trainer", %key, "Snapshot loaded");
                v
            }
            Err(e) => {
                warn!(target: "uml_trainer", %key, error = %e, "Corrupt snapshot; starting empty");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(target: "uml_trainer", %key, error = %e, "Snapshot load failed; starting empty");
            T::default()
        }
    }
}

/// Encode and save a snapshot. Returns whether the write succeeded; callers
/// are free to ignore it.
pub fn save_snapshot<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(PersistenceError::from)
        .and_then(|raw| store.save(key, &raw));
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "uml_trainer", %key, error = %e, "Snapshot save failed; keeping in-memory state");
            false
        }
    }
}
