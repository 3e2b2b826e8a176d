//! Storage backend implementations.
//!
//! Two backends cover the engine's needs:
//! - InMemoryStore: fast, ephemeral storage for testing
//! - FileStore: JSON file-based persistent storage

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Trait for storage backends
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// List all keys with a given prefix
    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>>;

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;

    /// Clear all data
    fn clear(&self) -> Result<()>;
}

fn lock_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Storage(format!("lock error: {}", e))
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend (for testing and ephemeral use)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut data = self.data.write().map_err(lock_err)?;
        Ok(data.remove(key).is_some())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.contains_key(key))
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.clear();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE-BASED STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// File-based storage backend using a single JSON data file with
/// hex-encoded keys and values
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    cache: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    dirty: RwLock<bool>,
}

impl FileStore {
    /// Open (or create) a file store rooted at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| Error::Storage(format!("failed to create directory: {}", e)))?;
        }

        let store = Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
            dirty: RwLock::new(false),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn data_file_path(&self) -> PathBuf {
        self.base_path.join("data.json")
    }

    fn load_from_disk(&self) -> Result<()> {
        let path = self.data_file_path();
        if !path.exists() {
            return Ok(());
        }

        let file = File::open(&path)
            .map_err(|e| Error::Storage(format!("failed to open data file: {}", e)))?;
        let reader = BufReader::new(file);
        let data: HashMap<String, String> = serde_json::from_reader(reader)
            .map_err(|e| Error::Storage(format!("failed to parse data file: {}", e)))?;

        let mut cache = self.cache.write().map_err(lock_err)?;
        for (key_hex, value_hex) in data {
            let key = hex::decode(&key_hex)
                .map_err(|e| Error::Storage(format!("invalid key in storage: {}", e)))?;
            let value = hex::decode(&value_hex)
                .map_err(|e| Error::Storage(format!("invalid value in storage: {}", e)))?;
            cache.insert(key, value);
        }
        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        let cache = self.cache.read().map_err(lock_err)?;
        let data: HashMap<String, String> = cache
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.data_file_path())
            .map_err(|e| Error::Storage(format!("failed to open data file: {}", e)))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &data)
            .map_err(|e| Error::Storage(format!("failed to write data file: {}", e)))?;

        let mut dirty = self.dirty.write().map_err(lock_err)?;
        *dirty = false;
        Ok(())
    }
}

impl StorageBackend for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let cache = self.cache.read().map_err(lock_err)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut cache = self.cache.write().map_err(lock_err)?;
        cache.insert(key.to_vec(), value.to_vec());
        drop(cache);
        let mut dirty = self.dirty.write().map_err(lock_err)?;
        *dirty = true;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut cache = self.cache.write().map_err(lock_err)?;
        let existed = cache.remove(key).is_some();
        drop(cache);
        if existed {
            let mut dirty = self.dirty.write().map_err(lock_err)?;
            *dirty = true;
        }
        Ok(existed)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        let cache = self.cache.read().map_err(lock_err)?;
        Ok(cache.contains_key(key))
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        let cache = self.cache.read().map_err(lock_err)?;
        Ok(cache.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self.dirty.read().map_err(lock_err)?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write().map_err(lock_err)?;
        cache.clear();
        drop(cache);
        let mut dirty = self.dirty.write().map_err(lock_err)?;
        *dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let store = InMemoryStore::new();
        store.set(b"a", b"1").unwrap();
        store.set(b"ab", b"2").unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.exists(b"ab").unwrap());
        assert_eq!(store.list_prefix(b"a").unwrap().len(), 2);
        assert!(store.delete(b"a").unwrap());
        assert!(!store.delete(b"a").unwrap());
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert!(store.delete(b"key1").unwrap());
        assert!(!store.exists(b"key1").unwrap());

        store.set(b"key2", b"value2").unwrap();
        store.flush().unwrap();
        assert!(dir.path().join("data.json").exists());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        {
            let store = FileStore::new(&path).unwrap();
            store.set(b"snapshot/live", b"data").unwrap();
            store.flush().unwrap();
        }

        {
            let store = FileStore::new(&path).unwrap();
            assert_eq!(store.get(b"snapshot/live").unwrap(), Some(b"data".to_vec()));
            assert_eq!(store.list_prefix(b"snapshot/").unwrap().len(), 1);
        }
    }
}
