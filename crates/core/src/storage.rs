//! Key-value storage abstraction backing the token store
//!
//! The browser keeps identity state in local storage; everywhere else a
//! small key-value capability is enough. Implementations only need string
//! keys and values.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying store could not be read or written
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Stored document could not be parsed
    #[error("storage corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// IO failure on a file-backed store
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
}

/// String key-value storage capability
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, overwriting any prior value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`, if any
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed storage holding all entries in a single JSON document
///
/// Every operation reads and rewrites the whole document. The identity
/// state this backs is a handful of keys, so simplicity wins over IO
/// cleverness.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles between threads of one process.
    lock: RwLock<()>,
}

impl FileStorage {
    /// Create a store persisting to `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self
            .lock
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// Mock implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub Storage {}

        impl KeyValueStorage for Storage {
            fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
            fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
            fn remove(&self, key: &str) -> Result<(), StorageError>;
        }
    }
}
