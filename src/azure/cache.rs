//! Response cache
//!
//! Memoizes ARM lookups under string keys of the form `{kind}:{subject}`.
//! The cache is best-effort: a miss only means "recompute", and callers must
//! tolerate a miss for a key they set a moment ago.

use super::models::{
    LoadBalancer, ManagedCluster, NetworkSecurityGroup, RouteTable, Subnet, VirtualNetwork,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default lifetime of a cache entry
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default upper bound on stored entries
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Build a cache key from a semantic prefix and a subject
pub fn cache_key(prefix: &str, subject: &str) -> String {
    format!("{}:{}", prefix, subject)
}

/// A cached payload
#[derive(Debug, Clone)]
pub enum CacheValue {
    ResourceId(String),
    Cluster(Arc<ManagedCluster>),
    Clusters(Arc<Vec<ManagedCluster>>),
    Subnet(Arc<Subnet>),
    VirtualNetwork(Arc<VirtualNetwork>),
    RouteTable(Arc<RouteTable>),
    SecurityGroup(Arc<NetworkSecurityGroup>),
    LoadBalancer(Arc<LoadBalancer>),
}

impl CacheValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheValue::ResourceId(_) => "resource-id",
            CacheValue::Cluster(_) => "cluster",
            CacheValue::Clusters(_) => "clusters",
            CacheValue::Subnet(_) => "subnet",
            CacheValue::VirtualNetwork(_) => "virtual-network",
            CacheValue::RouteTable(_) => "route-table",
            CacheValue::SecurityGroup(_) => "security-group",
            CacheValue::LoadBalancer(_) => "load-balancer",
        }
    }

    pub fn into_resource_id(self) -> Option<String> {
        match self {
            CacheValue::ResourceId(id) => Some(id),
            _ => None,
        }
    }

    pub fn into_cluster(self) -> Option<Arc<ManagedCluster>> {
        match self {
            CacheValue::Cluster(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_clusters(self) -> Option<Arc<Vec<ManagedCluster>>> {
        match self {
            CacheValue::Clusters(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_subnet(self) -> Option<Arc<Subnet>> {
        match self {
            CacheValue::Subnet(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_virtual_network(self) -> Option<Arc<VirtualNetwork>> {
        match self {
            CacheValue::VirtualNetwork(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_route_table(self) -> Option<Arc<RouteTable>> {
        match self {
            CacheValue::RouteTable(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_security_group(self) -> Option<Arc<NetworkSecurityGroup>> {
        match self {
            CacheValue::SecurityGroup(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_load_balancer(self) -> Option<Arc<LoadBalancer>> {
        match self {
            CacheValue::LoadBalancer(l) => Some(l),
            _ => None,
        }
    }
}

/// Thread-safe key/value store for resolved lookups
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheValue>;
    async fn set(&self, key: &str, value: CacheValue);
    async fn delete(&self, key: &str);
}

struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

/// In-memory cache with a fixed per-entry TTL and a bounded size.
///
/// When full, a new key first evicts expired entries and then the entry
/// closest to expiry.
pub struct AzureCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl AzureCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Cap the number of stored entries (at least one)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included until evicted
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        evict_expired(&mut entries)
    }
}

fn evict_expired(entries: &mut HashMap<String, CacheEntry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

impl Default for AzureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[async_trait]
impl ResponseCache for AzureCache {
    async fn get(&self, key: &str) -> Option<CacheValue> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    tracing::debug!("cache hit: {}", key);
                    return Some(entry.value.clone());
                }
                None => {
                    tracing::debug!("cache miss: {}", key);
                    return None;
                }
                Some(_) => {}
            }
        }

        // Expired: evict unless someone refreshed it meanwhile
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        tracing::debug!("cache expired: {}", key);
        None
    }

    async fn set(&self, key: &str, value: CacheValue) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            evict_expired(&mut entries);

            if entries.len() >= self.max_entries {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    tracing::debug!("cache full, evicting {}", oldest);
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

/// A cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<CacheValue> {
        None
    }

    async fn set(&self, _key: &str, _value: CacheValue) {}

    async fn delete(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        tokio_test::block_on(async {
            let cache = AzureCache::default();
            let key = cache_key("subnet-nsg", "/subnet/a");
            assert_eq!(key, "subnet-nsg:/subnet/a");

            assert!(cache.get(&key).await.is_none());

            cache
                .set(&key, CacheValue::ResourceId("/nsg/a".to_string()))
                .await;
            let hit = cache.get(&key).await.and_then(CacheValue::into_resource_id);
            assert_eq!(hit.as_deref(), Some("/nsg/a"));

            cache.delete(&key).await;
            assert!(cache.get(&key).await.is_none());
        });
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = AzureCache::new(Duration::from_millis(10));
        cache
            .set("k", CacheValue::ResourceId("v".to_string()))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("k").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = AzureCache::new(Duration::ZERO);
        cache.set("a", CacheValue::ResourceId("1".into())).await;
        cache.set("b", CacheValue::ResourceId("2".into())).await;
        assert_eq!(cache.purge_expired().await, 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_max_entries_evicts_oldest() {
        let cache = AzureCache::new(Duration::from_secs(60)).with_max_entries(2);
        cache.set("a", CacheValue::ResourceId("1".into())).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("b", CacheValue::ResourceId("2".into())).await;
        tokio::time::sleep(Duration::from_millis(2)).await;

        // Overwriting a stored key never evicts
        cache.set("b", CacheValue::ResourceId("3".into())).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_some());

        cache.set("c", CacheValue::ResourceId("4".into())).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_full_cache_drops_expired_first() {
        let cache = AzureCache::new(Duration::ZERO).with_max_entries(2);
        cache.set("a", CacheValue::ResourceId("1".into())).await;
        cache.set("b", CacheValue::ResourceId("2".into())).await;
        cache.set("c", CacheValue::ResourceId("3".into())).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_typed_accessors_reject_other_variants() {
        let value = CacheValue::Cluster(Arc::new(ManagedCluster::default()));
        assert_eq!(value.kind(), "cluster");
        assert!(value.clone().into_resource_id().is_none());
        assert!(value.into_cluster().is_some());
    }

    #[tokio::test]
    async fn test_noop_cache_never_hits() {
        let cache = NoopCache;
        cache.set("k", CacheValue::ResourceId("v".into())).await;
        assert!(cache.get("k").await.is_none());
    }
}
