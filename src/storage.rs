//! Visitor-scoped key/value storage and the assignment store
//!
//! Each visitor owns a private storage instance; nothing is shared across
//! visitors. `AssignmentStore` layers the `experiment_<id>` key convention
//! on top of a raw backend and swallows backend failures: a broken store
//! reads as "no assignment" and writes become no-ops, so bucketing can
//! never take the host down.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Key prefix for persisted assignments
pub const STORAGE_PREFIX: &str = "experiment_";

/// Raw durable key/value storage capability.
///
/// Backends may fail; callers that must not raise wrap them in
/// [`AssignmentStore`], which degrades failures to absence.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory backend, the default for one browser-session-like scope.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }
}

/// File-backed backend: one JSON object per visitor.
///
/// Reads parse the whole file, writes rewrite it. Suits the small handful
/// of keys a single visitor ever holds.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Backend that always fails, for exercising the degraded path.
#[derive(Debug, Default)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::StorageError("storage unavailable".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::StorageError("storage unavailable".to_string()))
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        Err(Error::StorageError("storage unavailable".to_string()))
    }

    fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(Error::StorageError("storage unavailable".to_string()))
    }
}

fn storage_key(experiment_id: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, experiment_id)
}

/// Per-visitor assignment store.
///
/// Overwrites via `set` are permitted and last-write-wins; under correct
/// use the session manager writes each experiment key at most once.
pub struct AssignmentStore {
    backend: Box<dyn KeyValueStorage>,
}

impl AssignmentStore {
    pub fn new(backend: Box<dyn KeyValueStorage>) -> Self {
        Self { backend }
    }

    /// In-memory store, the common test and single-session setup.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Stored variant for an experiment, or `None` when absent or when the
    /// backend fails.
    pub fn get(&self, experiment_id: &str) -> Option<String> {
        match self.backend.get(&storage_key(experiment_id)) {
            Ok(value) => value,
            Err(err) => {
                debug!(experiment = experiment_id, error = %err, "Assignment read failed, treating as absent");
                None
            }
        }
    }

    /// Persist a variant for an experiment. Backend failures are dropped.
    pub fn set(&mut self, experiment_id: &str, variant: &str) {
        if let Err(err) = self.backend.set(&storage_key(experiment_id), variant) {
            debug!(experiment = experiment_id, error = %err, "Assignment write failed, skipping persist");
        }
    }

    /// Remove every assignment this visitor holds. Best-effort.
    pub fn clear_all(&mut self) {
        let keys = match self.backend.keys_with_prefix(STORAGE_PREFIX) {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "Could not enumerate assignments to clear");
                return;
            }
        };

        for key in keys {
            if let Err(err) = self.backend.remove(&key) {
                warn!(key = %key, error = %err, "Could not remove assignment");
            }
        }
    }
}

impl std::fmt::Debug for AssignmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentStore").finish_non_exhaustive()
    }
}
