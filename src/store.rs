use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::ConsentError;

/// Flat string key/value storage, shaped like browser local storage.
pub trait ConsentStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError>;
    fn remove(&self, key: &str) -> Result<(), ConsentError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    disabled: bool,
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects writes once keys plus values would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.lock_state().quota = Some(bytes);
        store
    }

    /// Every operation fails, as when storage is disabled by the browser.
    pub fn disabled() -> Self {
        let store = Self::default();
        store.lock_state().disabled = true;
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock_state().entries.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock_state().entries.get(key).cloned()
    }

    /// Writes directly, bypassing quota and the disabled flag.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock_state()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-write; the map is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConsentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        let state = self.lock_state();
        if state.disabled {
            return Err(ConsentError::storage("storage is disabled"));
        }
        Ok(state.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError> {
        let mut state = self.lock_state();
        if state.disabled {
            return Err(ConsentError::storage("storage is disabled"));
        }
        if let Some(quota) = state.quota {
            let used: usize = state
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(ConsentError::storage(format!(
                    "quota of {quota} bytes exceeded"
                )));
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConsentError> {
        let mut state = self.lock_state();
        if state.disabled {
            return Err(ConsentError::storage("storage is disabled"));
        }
        state.entries.remove(key);
        Ok(())
    }
}

/// Key/value map persisted as a single JSON object on disk.
///
/// A missing file reads as an empty store. A file that is not a JSON object of
/// strings makes the whole store unavailable rather than being overwritten.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, ConsentError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(ConsentError::storage(format!(
                    "read {}: {err}",
                    self.path.display()
                )));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            ConsentError::storage(format!("parse {}: {err}", self.path.display()))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), ConsentError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    ConsentError::storage(format!("create {}: {err}", parent.display()))
                })?;
            }
        }
        let text = serde_json::to_string_pretty(map).map_err(ConsentError::storage)?;
        std::fs::write(&self.path, text).map_err(|err| {
            ConsentError::storage(format!("write {}: {err}", self.path.display()))
        })
    }
}

impl ConsentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), ConsentError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
