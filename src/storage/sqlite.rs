use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::KeyValueStore;
use crate::error::Result;

/// All keys in one SQLite file, one row per key
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.initialize_tables()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.initialize_tables()?;
        Ok(store)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL, -- JSON
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let text = serde_json::to_string(&value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            params![key, text],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_round_trip() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("tunewell-settings").unwrap(), None);

        store.set("tunewell-settings", json!({"equalizer": {"enabled": true}})).unwrap();
        store.set("tunewell-settings", json!({"equalizer": {"enabled": false}})).unwrap();

        assert_eq!(
            store.get("tunewell-settings").unwrap(),
            Some(json!({"equalizer": {"enabled": false}}))
        );
        assert_eq!(store.keys().unwrap(), vec!["tunewell-settings".to_string()]);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tunewell.db");
        {
            let mut store = SqliteStore::new(&path).unwrap();
            store.set("player-storage", json!([1, 2, 3])).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.get("player-storage").unwrap(), Some(json!([1, 2, 3])));
    }
}
