//! Time-bounded host-config cache.
//!
//! [`HostConfigCache`] fronts a [`Resolver`] with a TTL'd key/value
//! store.  The backing [`ConfigStore`] is interchangeable: an
//! in-process bounded map ([`memory::MemoryConfigStore`]) or an
//! externally persisted store with native expiry
//! ([`redis::RedisConfigStore`]).
//!
//! Concurrent misses for the same hostname are not deduplicated: a
//! burst of first-requests for an uncached host may issue redundant
//! resolver calls before the entry lands.  Accepted race; last write
//! wins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::errors::ProxyError;
use crate::metrics;
use crate::resolver::{HostConfig, Resolver};

pub mod memory;
pub mod redis;

/// Policy applied when the resolver finds no deployment for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Cache a sentinel "host unknown" config so repeated requests for
    /// non-existent hosts do not hammer the resolver.
    CacheUnknown,
    /// Return the sentinel without caching it; every request for an
    /// unknown host goes back to the resolver.
    Bypass,
}

/// Async key/value contract for the cache backing store.
///
/// `get` applies TTL expiry lazily: an expired entry reads as a miss.
pub trait ConfigStore: Send + Sync + 'static {
    /// Look up the config for `hostname`, if present and unexpired.
    fn get(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>>;

    /// Insert or replace the config for `hostname` with a fresh TTL.
    fn set(
        &self,
        hostname: &str,
        config: &HostConfig,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), ProxyError>> + Send + '_>>;
}

/// Resolver-backed, TTL-bounded hostname cache.
pub struct HostConfigCache {
    store: Arc<dyn ConfigStore>,
    resolver: Arc<dyn Resolver>,
    ttl: Duration,
    miss_policy: MissPolicy,
}

impl HostConfigCache {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        resolver: Arc<dyn Resolver>,
        ttl: Duration,
        miss_policy: MissPolicy,
    ) -> Self {
        Self {
            store,
            resolver,
            ttl,
            miss_policy,
        }
    }

    /// Resolve `hostname`, consulting the store before the resolver.
    ///
    /// Always yields a config; "host unknown" is the sentinel config
    /// with no path, never an error.
    pub async fn resolve(&self, hostname: &str) -> Result<HostConfig, ProxyError> {
        if let Some(config) = self.store.get(hostname).await? {
            metrics::record_cache_hit();
            return Ok(config);
        }
        metrics::record_cache_miss();

        let config = match self.resolver.resolve(hostname).await? {
            Some(config) => config,
            None => {
                let sentinel = HostConfig::unknown();
                if self.miss_policy == MissPolicy::CacheUnknown {
                    self.store_entry(hostname, &sentinel).await;
                }
                return Ok(sentinel);
            }
        };

        self.store_entry(hostname, &config).await;
        Ok(config)
    }

    /// Overwrite the cached entry without re-invoking the resolver.
    ///
    /// Used by the 404 chain to persist the `custom_404` flag.  The
    /// configured TTL applies.
    pub async fn update(&self, hostname: &str, config: &HostConfig) -> Result<(), ProxyError> {
        self.store.set(hostname, config, self.ttl).await
    }

    /// [`update`](Self::update) with an explicit TTL.
    pub async fn update_with_ttl(
        &self,
        hostname: &str,
        config: &HostConfig,
        ttl: Duration,
    ) -> Result<(), ProxyError> {
        self.store.set(hostname, config, ttl).await
    }

    /// Cache-fill writes are best-effort: the resolved config is still
    /// returned to the caller when persistence fails.
    async fn store_entry(&self, hostname: &str, config: &HostConfig) {
        if let Err(err) = self.store.set(hostname, config, self.ttl).await {
            warn!(hostname, "failed to persist host config: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolver that counts calls and answers from a fixed table.
    struct FixedResolver {
        known: Vec<(String, HostConfig)>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(known: Vec<(&str, HostConfig)>) -> Arc<Self> {
            Arc::new(Self {
                known: known
                    .into_iter()
                    .map(|(h, c)| (h.to_string(), c))
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Resolver for FixedResolver {
        fn resolve(
            &self,
            hostname: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = self
                .known
                .iter()
                .find(|(h, _)| h == hostname)
                .map(|(_, c)| c.clone());
            Box::pin(async move { Ok(found) })
        }
    }

    fn cache_with(
        resolver: Arc<FixedResolver>,
        ttl: Duration,
        miss_policy: MissPolicy,
    ) -> HostConfigCache {
        let store = Arc::new(memory::MemoryConfigStore::new(16));
        HostConfigCache::new(store, resolver, ttl, miss_policy)
    }

    #[tokio::test]
    async fn hit_skips_the_resolver() {
        let resolver = FixedResolver::new(vec![("example.com", HostConfig::with_path("/proj"))]);
        let cache = cache_with(
            resolver.clone(),
            Duration::from_secs(120),
            MissPolicy::CacheUnknown,
        );

        let first = cache.resolve("example.com").await.unwrap();
        let second = cache.resolve("example.com").await.unwrap();
        assert_eq!(first.path.as_deref(), Some("/proj"));
        assert_eq!(first, second);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_re_resolves() {
        let resolver = FixedResolver::new(vec![("example.com", HostConfig::with_path("/proj"))]);
        let cache = cache_with(resolver.clone(), Duration::ZERO, MissPolicy::CacheUnknown);

        cache.resolve("example.com").await.unwrap();
        cache.resolve("example.com").await.unwrap();
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_host_sentinel_is_negatively_cached() {
        let resolver = FixedResolver::new(vec![]);
        let cache = cache_with(
            resolver.clone(),
            Duration::from_secs(120),
            MissPolicy::CacheUnknown,
        );

        let first = cache.resolve("nobody.example.net").await.unwrap();
        let second = cache.resolve("nobody.example.net").await.unwrap();
        assert!(first.is_unknown());
        assert!(second.is_unknown());
        // The sentinel entry absorbs the second request.
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn bypass_policy_never_caches_unknown_hosts() {
        let resolver = FixedResolver::new(vec![]);
        let cache = cache_with(
            resolver.clone(),
            Duration::from_secs(120),
            MissPolicy::Bypass,
        );

        assert!(cache.resolve("nobody.example.net").await.unwrap().is_unknown());
        assert!(cache.resolve("nobody.example.net").await.unwrap().is_unknown());
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn update_overwrites_without_resolving() {
        let resolver = FixedResolver::new(vec![("example.com", HostConfig::with_path("/proj"))]);
        let cache = cache_with(
            resolver.clone(),
            Duration::from_secs(120),
            MissPolicy::CacheUnknown,
        );

        let mut config = cache.resolve("example.com").await.unwrap();
        config.custom_404 = false;
        cache.update("example.com", &config).await.unwrap();

        let read_back = cache.resolve("example.com").await.unwrap();
        assert!(!read_back.custom_404);
        assert_eq!(resolver.calls(), 1);
    }
}
