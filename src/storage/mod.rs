//! Opaque key-value persistence
//!
//! Each store writes one JSON blob under a fixed key. Backends know nothing
//! about what is inside a blob.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const PLAYER_STORAGE_KEY: &str = "player-storage";
pub const PLAYLISTS_STORAGE_KEY: &str = "tunewell-playlists";
pub const SETTINGS_STORAGE_KEY: &str = "tunewell-settings";
pub const LIBRARY_STORAGE_KEY: &str = "tunewell-library";

pub trait KeyValueStore {
    /// `Ok(None)` when nothing was ever written under `key`
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// Read and decode a blob. Missing, unreadable and undecodable blobs all
/// come back as `None`; the last two are logged.
pub fn load_value<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let value = match store.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!("Nothing stored under '{}'", key);
            return None;
        }
        Err(e) => {
            warn!("Failed to read '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Discarding corrupt '{}' blob: {}", key, e);
            None
        }
    }
}

pub fn save_value<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?)
}

/// In-process only, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// One pretty-printed `<key>.json` file per key
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created storage directory: {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let path = self.key_path(key)?;
        // write next to the target, then swap it in
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&value)?)?;
        fs::rename(&tmp, &path)?;
        debug!("Saved '{}' to {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        count: u32,
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", json!({"count": 1})).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"count": 1})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("data")).unwrap();
        assert_eq!(store.get(PLAYER_STORAGE_KEY).unwrap(), None);

        store.set(PLAYER_STORAGE_KEY, json!({"volume": 0.5})).unwrap();
        assert!(dir.path().join("data/player-storage.json").exists());

        let reopened = JsonFileStore::new(dir.path().join("data")).unwrap();
        assert_eq!(reopened.get(PLAYER_STORAGE_KEY).unwrap(), Some(json!({"volume": 0.5})));
    }

    #[test]
    fn test_json_file_store_rejects_odd_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path()).unwrap();
        assert!(matches!(store.set("../escape", json!(1)), Err(Error::Storage(_))));
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_corrupt_file_reads_as_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.get("broken").is_err());
        assert_eq!(load_value::<Blob>(&store, "broken"), None);
    }

    #[test]
    fn test_load_and_save_value() {
        let mut store = MemoryStore::new();
        assert_eq!(load_value::<Blob>(&store, "blob"), None);

        save_value(&mut store, "blob", &Blob { count: 3 }).unwrap();
        assert_eq!(load_value::<Blob>(&store, "blob"), Some(Blob { count: 3 }));

        // wrong shape is discarded, not an error
        store.set("blob", json!("text")).unwrap();
        assert_eq!(load_value::<Blob>(&store, "blob"), None);
    }
}
