use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;

use crate::storage::{Storage, StorageError};

/// SQLite-backed key-value storage, one row per key.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let storage = SqliteStorage { conn };
        storage.initialize_schema()?;

        tracing::debug!(path = %db_path.display(), "opened storage");
        Ok(storage)
    }

    /// Storage that lives only as long as this value
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let storage = SqliteStorage {
            conn: Connection::open_in_memory()?,
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// When the value under `key` was last written, if ever
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, StorageError> {
        let updated_at = self
            .conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_fresh_database_is_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.get("todos").unwrap(), None);
        assert_eq!(storage.updated_at("todos").unwrap(), None);
    }

    #[test]
    fn set_then_get_overwrites() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.set("todos", "[]").unwrap();
        storage.set("todos", "[{}]").unwrap();
        assert_eq!(storage.get("todos").unwrap().as_deref(), Some("[{}]"));
        assert!(storage.updated_at("todos").unwrap().is_some());
    }

    #[test]
    fn persists_across_connections_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todos.db");
        let path = path.to_str().unwrap();

        let mut storage = SqliteStorage::new(path).unwrap();
        storage.set("todos", "[\"kept\"]").unwrap();
        drop(storage);

        let reopened = SqliteStorage::new(path).unwrap();
        assert_eq!(reopened.get("todos").unwrap().as_deref(), Some("[\"kept\"]"));
    }
}
