//! Named protocol snapshots over any storage backend.
//!
//! The whole engine serializes with bincode, so persistence is one value
//! per snapshot name under a common key prefix.

use crate::error::{Error, Result};
use crate::protocol::Protocol;
use crate::storage::backend::StorageBackend;

const SNAPSHOT_PREFIX: &[u8] = b"snapshot/";

fn key_for(name: &str) -> Vec<u8> {
    let mut key = SNAPSHOT_PREFIX.to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}

/// Persists and restores whole-protocol snapshots by name
pub struct SnapshotStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> SnapshotStore<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Save a snapshot under `name`, overwriting any existing one
    pub fn save(&self, name: &str, protocol: &Protocol) -> Result<()> {
        let bytes = bincode::serialize(protocol)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.set(&key_for(name), &bytes)?;
        self.backend.flush()
    }

    /// Load the snapshot saved under `name`
    pub fn load(&self, name: &str) -> Result<Protocol> {
        let bytes = self
            .backend
            .get(&key_for(name))?
            .ok_or_else(|| Error::Storage(format!("no snapshot named {}", name)))?;
        bincode::deserialize(&bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Delete the snapshot saved under `name`; true if one existed
    pub fn remove(&self, name: &str) -> Result<bool> {
        let existed = self.backend.delete(&key_for(name))?;
        self.backend.flush()?;
        Ok(existed)
    }

    /// Names of all saved snapshots
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .backend
            .list_prefix(SNAPSHOT_PREFIX)?
            .into_iter()
            .map(|k| String::from_utf8_lossy(&k[SNAPSHOT_PREFIX.len()..]).into_owned())
            .collect();
        names.sort();
        Ok(names)
    }
}
