//! In-process bounded config store.
//!
//! A `Mutex<HashMap>` keyed by hostname.  TTL expiry is checked lazily
//! on read; when the map is at capacity an insert displaces the
//! least-recently-used entry.  Useful for single-process deployments
//! and tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ConfigStore;
use crate::errors::ProxyError;
use crate::resolver::HostConfig;

struct Entry {
    config: HostConfig,
    expires_at: Instant,
    last_used: Instant,
}

/// Bounded TTL + LRU store.
pub struct MemoryConfigStore {
    capacity: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryConfigStore {
    /// Create a store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_sync(&self, hostname: &str) -> Option<HostConfig> {
        let mut entries = self.entries.lock().expect("mutex poisoned");
        let now = Instant::now();

        match entries.get_mut(hostname) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = now;
                Some(entry.config.clone())
            }
            Some(_) => {
                // Expired: drop it so the map does not fill with stale rows.
                entries.remove(hostname);
                None
            }
            None => None,
        }
    }

    fn set_sync(&self, hostname: &str, config: HostConfig, ttl: Duration) {
        let mut entries = self.entries.lock().expect("mutex poisoned");
        let now = Instant::now();

        if !entries.contains_key(hostname) && entries.len() >= self.capacity {
            let evict = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(host, _)| host.clone());
            if let Some(host) = evict {
                entries.remove(&host);
            }
        }

        entries.insert(
            hostname.to_string(),
            Entry {
                config,
                expires_at: now + ttl,
                last_used: now,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>> {
        let found = self.get_sync(hostname);
        Box::pin(async move { Ok(found) })
    }

    fn set(
        &self,
        hostname: &str,
        config: &HostConfig,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), ProxyError>> + Send + '_>> {
        self.set_sync(hostname, config.clone(), ttl);
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(120);

    #[tokio::test]
    async fn entry_is_served_before_expiry() {
        let store = MemoryConfigStore::new(8);
        let config = HostConfig::with_path("/site");
        store.set("example.com", &config, TTL).await.unwrap();
        assert_eq!(store.get("example.com").await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn entry_expires_at_ttl_boundary() {
        let store = MemoryConfigStore::new(8);
        let config = HostConfig::with_path("/site");
        // TTL of zero: expires_at == insertion time, so any later read
        // sits at or past the boundary and must miss.
        store
            .set("example.com", &config, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.get("example.com").await.unwrap(), None);
        // The expired row is dropped, not retained.
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn set_replaces_existing_entry() {
        let store = MemoryConfigStore::new(8);
        store
            .set("example.com", &HostConfig::with_path("/old"), TTL)
            .await
            .unwrap();
        store
            .set("example.com", &HostConfig::with_path("/new"), TTL)
            .await
            .unwrap();
        let config = store.get("example.com").await.unwrap().unwrap();
        assert_eq!(config.path.as_deref(), Some("/new"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = MemoryConfigStore::new(2);
        store
            .set("a.example", &HostConfig::with_path("/a"), TTL)
            .await
            .unwrap();
        store
            .set("b.example", &HostConfig::with_path("/b"), TTL)
            .await
            .unwrap();

        // Touch "a" so "b" becomes the LRU victim.
        store.get("a.example").await.unwrap();
        store
            .set("c.example", &HostConfig::with_path("/c"), TTL)
            .await
            .unwrap();

        assert!(store.get("a.example").await.unwrap().is_some());
        assert!(store.get("b.example").await.unwrap().is_none());
        assert!(store.get("c.example").await.unwrap().is_some());
        assert_eq!(store.len(), 2);
    }
}
