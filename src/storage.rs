use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create storage directory: {0}")]
    DirectoryError(String),
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes available")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Key-value persistence boundary the todo store writes through.
///
/// Values are opaque strings; callers own the serialization format.
pub trait Storage {
    /// Read the value stored under `key`, or `None` if nothing was stored yet
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-process storage, optionally limited to a byte quota across all values
/// the way browser local storage is.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys and values together exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Seed a value without counting it as a write
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    /// Number of successful `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("todos").unwrap(), None);
    }

    #[test]
    fn set_replaces_value_and_counts_writes() {
        let mut storage = MemoryStorage::new().with_entry("todos", "[]");
        assert_eq!(storage.writes(), 0);
        storage.set("todos", "[1]").unwrap();
        storage.set("todos", "[2]").unwrap();
        assert_eq!(storage.get("todos").unwrap().as_deref(), Some("[2]"));
        assert_eq!(storage.writes(), 2);
    }

    #[test]
    fn quota_rejects_oversized_value_and_keeps_previous() {
        let mut storage = MemoryStorage::with_quota(12);
        storage.set("k", "small").unwrap();
        let err = storage.set("k", "far too large a value").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 12, .. }));
        assert_eq!(storage.raw("k"), Some("small"));
    }

    #[test]
    fn quota_counts_replaced_value_once() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("k", "123456789").unwrap();
        storage.set("k", "987654321").unwrap();
        assert_eq!(storage.writes(), 2);
    }

    #[test]
    fn boxed_storage_delegates() {
        let mut storage: Box<dyn Storage> = Box::new(MemoryStorage::new());
        storage.set("a", "b").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("b"));
    }
}
