//! Bounded LRU cache with per-entry TTL.
//!
//! Memoizes reconciler and detail responses keyed by a canonicalized request
//! signature. Capacity-bounded with recency-order eviction; entries also
//! expire after a fixed TTL regardless of recency.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// A cached value plus its absolute expiry time.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// LRU-with-TTL cache.
///
/// `get` on a live entry promotes it to most-recently-used; `get` on an
/// expired entry evicts it and reports a miss. `set` always reinserts at the
/// MRU position with a fresh expiry and evicts at most one LRU entry when the
/// insertion pushes the size over capacity.
#[derive(Debug)]
pub struct LruTtlCache<T> {
    max_size: usize,
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
    /// Recency order, least-recently-used at the front.
    order: VecDeque<String>,
}

impl<T: Clone> LruTtlCache<T> {
    /// Create a cache holding at most `max_size` entries, each live for `ttl`.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size,
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => Instant::now() > entry.expires_at,
        };

        if expired {
            self.entries.remove(key);
            self.remove_from_order(key);
            return None;
        }

        self.remove_from_order(key);
        self.order.push_back(key.to_string());
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace a key at the MRU position with a fresh expiry.
    pub fn set(&mut self, key: &str, value: T) {
        if self.entries.contains_key(key) {
            self.remove_from_order(key);
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        self.order.push_back(key.to_string());

        if self.entries.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Number of live-or-expired entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_from_order(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}
