//! Network-fetch capability used by the agent.
//!
//! ### Per-call request options
//! - Method and headers are carried through unchanged
//! - Credentials mode: `omit` strips ambient cookies; headers the caller
//!   set itself, `Authorization` included, are sent as given
//! - Cache mode: `no-store` asks every intermediary to bypass its cache
//!
//! ### Status handling
//! - A completed exchange is `Ok` whatever its status; callers decide
//!   whether a non-2xx response is worth caching
//! - Transport errors, timeouts and oversized bodies are `Err`

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
pub use reqwest::{Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, cache_key, parse_origin, resolve, same_origin};

use swcache_core::{Error, Snapshot};

/// Whether credentials travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
}

/// How intermediary HTTP caches may treat a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
}

/// A request as the agent sees it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub credentials: Credentials,
    pub cache: CacheMode,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: header::HeaderMap::new(),
            credentials: Credentials::default(),
            cache: CacheMode::default(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy of this request with credentials omitted and transport caching
    /// disabled; method, URL and headers are kept.
    pub fn uncredentialed(&self) -> Self {
        Self { credentials: Credentials::Omit, cache: CacheMode::NoStore, ..self.clone() }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Capture this response for storage.
    ///
    /// Headers with non-UTF-8 values are dropped.
    pub fn snapshot(&self) -> Snapshot {
        let headers = self
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        Snapshot::new(self.final_url.as_str(), self.status.as_u16(), headers, self.bytes.to_vec())
            .with_status_text(self.status.canonical_reason().unwrap_or_default())
    }
}

/// Host network primitive.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request, honoring its credentials and cache modes.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&swcache_core::AgentConfig> for FetchConfig {
    fn from(config: &swcache_core::AgentConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// Apply credentials and cache modes to outgoing headers.
fn outgoing_headers(request: &FetchRequest) -> header::HeaderMap {
    let mut headers = request.headers.clone();

    if request.credentials == Credentials::Omit {
        headers.remove(header::COOKIE);
    }

    match request.cache {
        CacheMode::Default => {}
        CacheMode::NoStore => {
            headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));
            headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
        }
    }

    headers
}

/// reqwest-backed [`Network`].
///
/// The client keeps no cookie store, so credentials never leak between
/// requests beyond what the caller's headers carry.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{}ms: {}", self.config.timeout.as_millis(), err))
        } else {
            Error::NetworkFailure(err.to_string())
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(outgoing_headers(request))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, headers, bytes, fetch_ms })
    }
}
