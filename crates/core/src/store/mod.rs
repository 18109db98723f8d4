//! Named-cache store backing the agent's cache generations.
//!
//! The store is a set of named caches, each mapping a request key to a
//! response [`Snapshot`]. Two backends implement [`CacheStore`]:
//!
//! - [`SqliteCacheStore`]: persistent, WAL-mode SQLite via tokio-rusqlite
//! - [`MemoryCacheStore`]: process-local, for tests and ephemeral hosts
//!
//! Operations are never retried here. Failures propagate to the caller,
//! which decides whether a failed read counts as a miss.

pub mod connection;
pub mod generations;
pub mod memory;
pub mod migrations;
pub mod snapshot;

use async_trait::async_trait;

pub use crate::Error;

pub use connection::SqliteCacheStore;
pub use memory::MemoryCacheStore;
pub use snapshot::Snapshot;

/// Handle to an opened cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    name: String,
}

impl CacheHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Host-provided key/value blob store partitioned into named caches.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a cache by name, creating it if it doesn't exist.
    async fn open(&self, name: &str) -> Result<CacheHandle, Error>;

    /// Look up a stored snapshot.
    async fn get(&self, cache: &CacheHandle, key: &str) -> Result<Option<Snapshot>, Error>;

    /// Store a snapshot, replacing any previous entry for the key.
    async fn put(&self, cache: &CacheHandle, key: &str, snapshot: &Snapshot) -> Result<(), Error>;

    /// Keys stored in a cache, in ascending order.
    async fn keys(&self, cache: &CacheHandle) -> Result<Vec<String>, Error>;

    /// Names of every cache in the store, oldest first.
    async fn list_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a cache and all of its entries.
    ///
    /// Returns true if a cache with that name existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;
}
