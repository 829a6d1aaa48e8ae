//! Service discovery.
//!
//! Opening a connection walks two documents: the service root (which points at
//! the data endpoint) and the data endpoint (which lists the cypher and
//! transaction endpoints). Both are cached by exact URL string.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::client::RestClient;
use super::endpoint::{redact_url, EndpointUrl};
use super::error::RestResult;
use super::message::{DataEndpoint, ServiceRoot};

// ============================================================================
// DiscoveryCache
// ============================================================================

/// Storage for discovery documents.
///
/// Reads and writes are independent; two callers missing the same key may
/// both fetch and both store, the last write wins.
pub trait DiscoveryCache: Send + Sync {
    /// Cached service root for `url`.
    fn service_root(&self, url: &str) -> Option<ServiceRoot>;

    /// Store a service root.
    fn store_service_root(&self, url: &str, root: ServiceRoot);

    /// Cached data endpoint for `url`.
    fn data_endpoint(&self, url: &str) -> Option<DataEndpoint>;

    /// Store a data endpoint.
    fn store_data_endpoint(&self, url: &str, data: DataEndpoint);

    /// Forget both documents cached under `url`.
    fn invalidate(&self, url: &str);

    /// Forget everything.
    fn clear(&self);
}

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    stored_at: Instant,
}

/// In-memory cache with an optional time-to-live.
///
/// Without a TTL entries live as long as the cache.
#[derive(Debug, Default)]
pub struct MemoryDiscoveryCache {
    ttl: Option<Duration>,
    roots: RwLock<HashMap<String, Cached<ServiceRoot>>>,
    data: RwLock<HashMap<String, Cached<DataEndpoint>>>,
}

impl MemoryDiscoveryCache {
    /// Cache whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose entries expire `ttl` after being stored.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Number of cached documents (both kinds, expired ones included).
    pub fn len(&self) -> usize {
        self.roots.read().len() + self.data.read().len()
    }

    /// Nothing cached?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T: Clone>(&self, map: &RwLock<HashMap<String, Cached<T>>>, url: &str) -> Option<T> {
        let map = map.read();
        let entry = map.get(url)?;
        match self.ttl {
            Some(ttl) if entry.stored_at.elapsed() >= ttl => None,
            _ => Some(entry.value.clone()),
        }
    }
}

impl DiscoveryCache for MemoryDiscoveryCache {
    fn service_root(&self, url: &str) -> Option<ServiceRoot> {
        self.lookup(&self.roots, url)
    }

    fn store_service_root(&self, url: &str, root: ServiceRoot) {
        self.roots.write().insert(
            url.to_string(),
            Cached {
                value: root,
                stored_at: Instant::now(),
            },
        );
    }

    fn data_endpoint(&self, url: &str) -> Option<DataEndpoint> {
        self.lookup(&self.data, url)
    }

    fn store_data_endpoint(&self, url: &str, data: DataEndpoint) {
        self.data.write().insert(
            url.to_string(),
            Cached {
                value: data,
                stored_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, url: &str) {
        self.roots.write().remove(url);
        self.data.write().remove(url);
    }

    fn clear(&self) {
        self.roots.write().clear();
        self.data.write().clear();
    }
}

// ============================================================================
// EndpointResolver
// ============================================================================

/// Endpoints of one server, rebased onto the caller's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Single-statement endpoint
    pub cypher_url: String,
    /// Multi-statement endpoint, if the server has one
    pub transaction_url: Option<String>,
    /// Server version
    pub server_version: String,
}

/// Resolves and caches the discovery chain.
///
/// Cloning shares the cache.
#[derive(Clone)]
pub struct EndpointResolver {
    cache: Arc<dyn DiscoveryCache>,
}

impl EndpointResolver {
    /// Resolver backed by `cache`.
    pub fn new(cache: Arc<dyn DiscoveryCache>) -> Self {
        Self { cache }
    }

    /// Resolver backed by a fresh [`MemoryDiscoveryCache`].
    pub fn in_memory(ttl: Option<Duration>) -> Self {
        let cache = match ttl {
            Some(ttl) => MemoryDiscoveryCache::with_ttl(ttl),
            None => MemoryDiscoveryCache::new(),
        };
        Self::new(Arc::new(cache))
    }

    /// The backing cache.
    pub fn cache(&self) -> &Arc<dyn DiscoveryCache> {
        &self.cache
    }

    /// Fetch (or recall) the service root document at `url`.
    pub async fn resolve_service_root(&self, client: &RestClient, url: &str) -> RestResult<ServiceRoot> {
        if let Some(root) = self.cache.service_root(url) {
            tracing::debug!(url = %redact_url(url), "service root served from cache");
            return Ok(root);
        }

        tracing::debug!(url = %redact_url(url), "fetching service root");
        let root: ServiceRoot = client.get_json(url).await.map_err(|e| {
            tracing::warn!("Service root lookup failed for {}: {}", redact_url(url), e);
            e
        })?;

        self.cache.store_service_root(url, root.clone());
        Ok(root)
    }

    /// Fetch (or recall) the data endpoint document at `url`.
    pub async fn resolve_data_endpoint(&self, client: &RestClient, url: &str) -> RestResult<DataEndpoint> {
        if let Some(data) = self.cache.data_endpoint(url) {
            tracing::debug!(url = %redact_url(url), "data endpoint served from cache");
            return Ok(data);
        }

        tracing::debug!(url = %redact_url(url), "fetching data endpoint");
        let data: DataEndpoint = client.get_json(url).await.map_err(|e| {
            tracing::warn!("Data endpoint lookup failed for {}: {}", redact_url(url), e);
            e
        })?;

        self.cache.store_data_endpoint(url, data.clone());
        Ok(data)
    }

    /// Walk both discovery steps from `base` and rebase every endpoint onto it.
    pub async fn resolve(&self, client: &RestClient, base: &EndpointUrl) -> RestResult<Endpoints> {
        let root = self.resolve_service_root(client, base.as_str()).await?;
        let data_url = base.rebase(&root.data_endpoint)?;
        let data = self.resolve_data_endpoint(client, &data_url).await?;

        let cypher_url = base.rebase(&data.cypher)?;
        let transaction_url = data
            .transaction
            .as_deref()
            .map(|location| base.rebase(location))
            .transpose()?;

        Ok(Endpoints {
            cypher_url,
            transaction_url,
            server_version: data.server_version,
        })
    }
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::in_memory(None)
    }
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver").finish_non_exhaustive()
    }
}
