//! In-memory [`CacheStore`].
//!
//! Same semantics as the SQLite backend without persistence. Uses a tokio
//! RwLock over ordered maps for concurrent access.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheHandle, CacheStore, Snapshot};
use crate::Error;

#[derive(Debug, Default)]
struct Generations {
    /// Names in creation order.
    order: Vec<String>,
    entries: BTreeMap<String, BTreeMap<String, Snapshot>>,
}

impl Generations {
    fn ensure(&mut self, name: &str) -> &mut BTreeMap<String, Snapshot> {
        if !self.entries.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.entries.entry(name.to_string()).or_default()
    }
}

/// Process-local cache store.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheStore {
    inner: Arc<RwLock<Generations>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, name: &str) -> Result<CacheHandle, Error> {
        self.inner.write().await.ensure(name);
        Ok(CacheHandle::new(name))
    }

    async fn get(&self, cache: &CacheHandle, key: &str) -> Result<Option<Snapshot>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(cache.name()).and_then(|e| e.get(key)).cloned())
    }

    async fn put(&self, cache: &CacheHandle, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.ensure(cache.name()).insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn keys(&self, cache: &CacheHandle) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .get(cache.name())
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|n| n != name);
        Ok(inner.entries.remove(name).is_some())
    }
}
