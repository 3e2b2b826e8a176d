//! Persistence for protocol state.
//!
//! Backends store raw bytes; `SnapshotStore` layers named whole-protocol
//! snapshots on top of any backend.

pub mod backend;
pub mod snapshot;

pub use backend::{FileStore, InMemoryStore, StorageBackend, StorageKey, StorageValue};
pub use snapshot::SnapshotStore;
