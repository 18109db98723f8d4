//! Network-first request routing with cache fallback.
//!
//! Same-origin requests always try the network first. A successful GET
//! refreshes the active generation; a transport failure falls back to it.
//! Cross-origin requests are not handled yet and fall through to the host.

use std::sync::Arc;

use swcache_client::{FetchRequest, FetchResponse, Method, Network, cache_key, header, same_origin};
use swcache_core::{CacheHandle, CacheStore, Snapshot};

use crate::context::AgentContext;

/// A response produced by the router.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Fresh from the network.
    Network(FetchResponse),
    /// Replayed from the active generation.
    Cache(Snapshot),
}

impl Routed {
    pub fn status(&self) -> u16 {
        match self {
            Routed::Network(response) => response.status.as_u16(),
            Routed::Cache(snapshot) => snapshot.status,
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Routed::Network(response) => &response.bytes,
            Routed::Cache(snapshot) => &snapshot.body,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            Routed::Network(response) => response.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Routed::Cache(snapshot) => snapshot.content_type(),
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Routed::Network(_) => "network",
            Routed::Cache(_) => "cache",
        }
    }
}

pub struct RequestRouter {
    ctx: Arc<AgentContext>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
}

impl RequestRouter {
    pub fn new(ctx: Arc<AgentContext>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self { ctx, store, network }
    }

    /// Route an intercepted request.
    ///
    /// `None` means the agent does not answer and the host applies its
    /// default handling.
    pub async fn route(&self, request: &FetchRequest) -> Option<Routed> {
        if !same_origin(&request.url, self.ctx.origin()) {
            // TODO: cross-origin policy; these requests currently bypass the agent entirely.
            tracing::debug!(url = %request.url, "cross-origin request not handled");
            return None;
        }

        let key = cache_key(&request.url);
        let cacheable = request.method == Method::GET;

        match self.network.fetch(&request.uncredentialed()).await {
            Ok(response) => {
                if cacheable && response.status.is_success() {
                    self.refresh(&key, &response).await;
                }
                Some(Routed::Network(response))
            }
            Err(e) => {
                tracing::debug!(key = %key, "network fetch failed, trying cache: {e}");
                if !cacheable {
                    return None;
                }
                self.lookup(&key).await.map(Routed::Cache)
            }
        }
    }

    async fn active_cache(&self) -> Option<CacheHandle> {
        match self.store.open(&self.ctx.active_cache_name()).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!("failed to open active cache: {e}");
                None
            }
        }
    }

    async fn refresh(&self, key: &str, response: &FetchResponse) {
        let Some(cache) = self.active_cache().await else {
            return;
        };
        if let Err(e) = self.store.put(&cache, key, &response.snapshot()).await {
            tracing::warn!(key, "failed to refresh cached entry: {e}");
        }
    }

    async fn lookup(&self, key: &str) -> Option<Snapshot> {
        let cache = self.active_cache().await?;
        match self.store.get(&cache, key).await {
            Ok(hit) => {
                tracing::debug!(key, hit = hit.is_some(), "cache fallback");
                hit
            }
            Err(e) => {
                tracing::warn!(key, "cache lookup failed: {e}");
                None
            }
        }
    }
}
