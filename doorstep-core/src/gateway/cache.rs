//! TTL caches in front of the upstream clients.
//!
//! Reads are strictly read-through: a live hit short-circuits the
//! network call entirely, including rate-limit consumption. Expired
//! entries are kept in place rather than dropped on read, because the
//! road/path client deliberately serves stale data when its bucket or
//! its upstream refuses.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A concurrent key/value cache with a fixed time-to-live.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// A live (unexpired) value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// The most recent value for `key` regardless of expiry. Degraded
    /// reads only; prefer [`TtlCache::get`].
    pub fn get_stale(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop expired entries. Callers that rely on [`TtlCache::get_stale`]
    /// must not call this.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_hit() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), 1);
        assert_eq!(cache.get(&"k".to_string()), Some(1));
    }

    #[test]
    fn test_expired_entry_misses_but_stays_stale() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("k".to_string(), 1);
        assert_eq!(cache.get(&"k".to_string()), None);
        assert_eq!(cache.get_stale(&"k".to_string()), Some(1));
    }

    #[test]
    fn test_insert_replaces_value_and_restarts_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), 1);
        cache.insert("k".to_string(), 2);
        assert_eq!(cache.get(&"k".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), 1);
        cache.remove(&"k".to_string());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune_drops_only_expired() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("old".to_string(), 1);
        cache.prune_expired();
        assert_eq!(cache.get_stale(&"old".to_string()), None);
    }
}
