//! Bounded, time-limited concurrent cache.
//!
//! Provides [`TtlCache`], a thread-safe map whose entries expire after a fixed
//! time-to-live and whose size is capped. It is owned by whoever needs caching
//! (for example a credential-store wrapper) rather than living in a
//! process-wide singleton.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe cache with a capacity limit and per-entry time-to-live.
///
/// Uses `DashMap` for sharded concurrent access. When the cache is full,
/// expired entries are purged first; if it is still full, the oldest entry is
/// evicted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ruststack_core::TtlCache;
///
/// let cache = TtlCache::new(2, Duration::from_secs(60));
/// cache.insert("a".to_owned(), 1);
/// assert_eq!(cache.get(&"a".to_owned()), Some(1));
/// ```
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    inner: DashMap<K, Entry<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a new empty cache.
    ///
    /// A `capacity` of zero disables caching entirely.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: DashMap::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Get a live entry, removing it if it has expired.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        {
            let entry = self.inner.get(key)?;
            if !self.is_expired(&entry, now) {
                return Some(entry.value.clone());
            }
        }

        // Another thread may have refreshed the entry since the read guard was
        // dropped; only remove it if it is still expired.
        self.inner
            .remove_if(key, |_, entry| self.is_expired(entry, now));
        None
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        if !self.inner.contains_key(&key) && self.inner.len() >= self.capacity {
            self.purge_expired(now);
            if self.inner.len() >= self.capacity {
                self.evict_oldest();
            }
        }

        self.inner.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Remove an entry.
    pub fn invalidate(&self, key: &K) {
        self.inner.remove(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Number of entries, including ones that have expired but not been purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn purge_expired(&self, now: Instant) {
        self.inner.retain(|_, entry| !self.is_expired(entry, now));
    }

    fn evict_oldest(&self) {
        let oldest = self
            .inner
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.inner.remove(&key);
        }
    }
}
