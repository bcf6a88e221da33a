use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

/// Key holding the generation API credential
pub const CREDENTIAL_KEY: &str = "studio_api_key";

/// Key holding the JSON-encoded project library
pub const LIBRARY_KEY: &str = "studio_projects";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Could not create data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Synchronous local key-value store.
///
/// Every value is an opaque string; writes overwrite the previous value.
pub trait Storage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// SQLite-backed store, one row per key.
pub struct SqliteStorage {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) the store at `db_path`.
    ///
    /// The parent directory is created if it does not exist yet.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        info!(path = %db_path.display(), "Storage opened");

        let storage = SqliteStorage {
            conn,
            db_path: db_path.to_path_buf(),
        };
        storage.init_schema()?;

        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// In-memory store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("nested").join("studio.db")).unwrap();

        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);

        storage.set(CREDENTIAL_KEY, "first").unwrap();
        storage.set(CREDENTIAL_KEY, "second").unwrap();

        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.set(LIBRARY_KEY, "[]").unwrap();
        }

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get(LIBRARY_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_keys_are_independent() {
        let storage = MemoryStorage::new();
        storage.set(CREDENTIAL_KEY, "key").unwrap();

        assert_eq!(storage.get(LIBRARY_KEY).unwrap(), None);
        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("key"));
    }
}
