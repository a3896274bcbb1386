//! Expiring key/value cache with background sweep
//!
//! A deliberately small TTL cache: per-entry absolute expiry, no LRU, no
//! size bound beyond the sweep. Correctness never depends on a hit; a miss
//! only forces recomputation from the source token or cookie. Two instances
//! exist per process (decoded claims, parsed metadata) with different TTLs.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// Absolute expiry, unix millis.
    expires_at: i64,
}

/// Concurrent map with per-entry TTL.
///
/// Cloning is cheap and shares the underlying map; the gatekeeper and the
/// background sweeper hold clones of the same instance.
#[derive(Clone)]
pub struct ExpiringCache<K, V> {
    label: &'static str,
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache. The label only appears in sweep logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Look up a live entry. Entries past their expiry read as absent even
    /// before the sweeper removes them.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, now_millis())
    }

    /// Insert a value that expires `ttl` from now.
    pub fn put(&self, key: K, value: V, ttl: Duration) {
        self.put_at(key, value, ttl, now_millis());
    }

    /// Number of entries, including any not yet swept.
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop every entry whose expiry has passed. Returns how many were
    /// removed. Holds the write lock for a single retain pass.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_millis())
    }

    fn get_at(&self, key: &K, now: i64) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    fn put_at(&self, key: K, value: V, ttl: Duration, now: i64) {
        let expires_at = now + ttl.as_millis() as i64;
        self.entries.write().insert(key, Entry { value, expires_at });
    }

    fn sweep_at(&self, now: i64) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

impl<K, V> std::fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("label", &self.label)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

/// Type-erased handle a sweeper can drive without knowing K/V.
pub trait Sweepable: Send + Sync {
    fn sweep_expired(&self) -> usize;
    fn label(&self) -> &'static str;
}

impl<K, V> Sweepable for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn sweep_expired(&self) -> usize {
        self.sweep()
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

/// Background sweeper task over a fixed set of caches.
///
/// Not user-visible; its only job is to bound memory. A missed or delayed
/// sweep is harmless because `get` already treats dead entries as absent.
pub struct Sweeper;

impl Sweeper {
    /// Spawn the sweep loop on the current tokio runtime. The task runs
    /// until the returned handle is aborted or the runtime shuts down.
    pub fn spawn(caches: Vec<Arc<dyn Sweepable>>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so a fresh
            // process does not sweep empty maps at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                for cache in &caches {
                    let removed = cache.sweep_expired();
                    if removed > 0 {
                        tracing::debug!(
                            cache = cache.label(),
                            removed,
                            "swept expired cache entries"
                        );
                    }
                }
            }
        })
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
