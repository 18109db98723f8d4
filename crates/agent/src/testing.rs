//! Fakes shared by the agent's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use swcache_client::header::{self, HeaderMap, HeaderValue};
use swcache_client::{FetchRequest, FetchResponse, Network, StatusCode, cache_key};
use swcache_core::{CacheHandle, CacheStore, Error, Manifest, Snapshot, VersionRegistry};
use url::Url;

use crate::context::AgentContext;

pub const ORIGIN: &str = "https://app.test/";

pub fn context(version: u32) -> Arc<AgentContext> {
    Arc::new(AgentContext::new(
        Url::parse(ORIGIN).unwrap(),
        VersionRegistry::new("sw", version),
        Manifest::default(),
    ))
}

pub fn request(path: &str) -> FetchRequest {
    FetchRequest::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
}

pub fn snapshot(path: &str, body: &str) -> Snapshot {
    let headers = vec![("content-type".to_string(), "text/plain".to_string())];
    Snapshot::new(format!("https://app.test{path}"), 200, headers, body.as_bytes().to_vec())
}

/// Scripted network keyed by cache key. Unknown paths answer 404.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<FetchRequest>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.as_bytes().to_vec()));
    }

    /// Make a single path fail at the transport layer.
    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().push(path.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.calls().iter().map(|r| cache_key(&r.url)).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(request.clone());
        let key = cache_key(&request.url);

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&key) {
            return Err(Error::NetworkFailure(format!("{key} unreachable")));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or((404, b"not found".to_vec()));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes: Bytes::from(body),
            fetch_ms: 1,
        })
    }
}

/// Store whose every operation fails, or only lookups, or only deletes of
/// chosen names.
#[derive(Default)]
pub struct FailingStore {
    pub inner: swcache_core::MemoryCacheStore,
    fail_all: bool,
    fail_gets: bool,
    fail_deletes: Vec<String>,
}

impl FailingStore {
    pub fn broken() -> Self {
        Self { fail_all: true, ..Self::default() }
    }

    pub fn failing_gets() -> Self {
        Self { fail_gets: true, ..Self::default() }
    }

    pub fn failing_deletes(names: &[&str]) -> Self {
        Self { fail_deletes: names.iter().map(|n| n.to_string()).collect(), ..Self::default() }
    }

    fn check(&self) -> Result<(), Error> {
        if self.fail_all { Err(Error::StorageFailure("store unavailable".into())) } else { Ok(()) }
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, name: &str) -> Result<CacheHandle, Error> {
        self.check()?;
        self.inner.open(name).await
    }

    async fn get(&self, cache: &CacheHandle, key: &str) -> Result<Option<Snapshot>, Error> {
        self.check()?;
        if self.fail_gets {
            return Err(Error::StorageFailure(format!("cannot read {key}")));
        }
        self.inner.get(cache, key).await
    }

    async fn put(&self, cache: &CacheHandle, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.check()?;
        self.inner.put(cache, key, snapshot).await
    }

    async fn keys(&self, cache: &CacheHandle) -> Result<Vec<String>, Error> {
        self.check()?;
        self.inner.keys(cache).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.check()?;
        self.inner.list_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.check()?;
        if self.fail_deletes.iter().any(|n| n == name) {
            return Err(Error::StorageFailure(format!("cannot delete {name}")));
        }
        self.inner.delete(name).await
    }
}
