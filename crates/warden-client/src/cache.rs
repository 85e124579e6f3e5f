//! Bounded response cache.
//!
//! Entries are keyed by method, URL and normalized params. The cache holds at
//! most `capacity` entries, evicting the least recently used, and an entry
//! older than `ttl` is treated as a miss.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use warden_core::CacheConfig;

struct Entry {
    data: Value,
    stored_at: Instant,
}

struct CacheState {
    entries: HashMap<String, Entry>,
    access_order: VecDeque<String>,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            if let Some(k) = self.access_order.remove(pos) {
                self.access_order.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        self.access_order.retain(|k| k != key);
    }
}

/// LRU + TTL cache of successful response bodies.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Cache with explicit bounds. A zero capacity is raised to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                access_order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Cache sized from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    /// Cache key for a request.
    pub fn key(method: &str, url: &str, params: &str) -> String {
        format!("{method} {url}?{params}")
    }

    /// Fresh entry for `key`, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
        };
        if expired {
            state.forget(key);
            tracing::trace!(key, "response cache entry expired");
            return None;
        }
        state.touch(key);
        state.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Store a body, evicting the least recently used entries beyond capacity.
    pub fn insert(&self, key: String, data: Value) {
        let mut state = self.state.lock();
        let entry = Entry {
            data,
            stored_at: Instant::now(),
        };
        if state.entries.insert(key.clone(), entry).is_some() {
            state.touch(&key);
        } else {
            state.access_order.push_back(key);
        }

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.access_order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            tracing::trace!(key = %oldest, "response cache evicted");
        }
    }

    /// Drop every entry for `url` or a path below it (any method or params).
    /// `/api/policies` covers `/api/policies/3` but not `/api/policies-archive`.
    pub fn invalidate_prefix(&self, url: &str) -> usize {
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| {
                key.split_once(' ')
                    .is_some_and(|(_, rest)| is_under(rest, url))
            })
            .cloned()
            .collect();
        for key in &doomed {
            state.forget(key);
        }
        doomed.len()
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.access_order.clear();
    }

    /// Number of entries, including any not yet found to be expired.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Whether `target` (a URL with optional query) is `url` itself or a
/// sub-path of it.
fn is_under(target: &str, url: &str) -> bool {
    let Some(tail) = target.strip_prefix(url) else {
        return false;
    };
    url.ends_with('/') || tail.is_empty() || tail.starts_with(['/', '?'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(url: &str) -> String {
        ResponseCache::key("GET", url, "")
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.insert(key("/a"), json!(1));
        cache.insert(key("/b"), json!(2));
        assert_eq!(cache.get(&key("/a")), Some(json!(1)));

        cache.insert(key("/c"), json!(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("/b")), None);
        assert_eq!(cache.get(&key("/a")), Some(json!(1)));
        assert_eq!(cache.get(&key("/c")), Some(json!(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = ResponseCache::new(8, Duration::from_millis(100));
        cache.insert(key("/a"), json!(1));
        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(cache.get(&key("/a")).is_some());
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        cache.insert(ResponseCache::key("GET", "/api/policies", "page=1"), json!([]));
        cache.insert(ResponseCache::key("GET", "/api/policies/3", ""), json!({}));
        cache.insert(ResponseCache::key("GET", "/api/users", ""), json!([]));

        assert_eq!(cache.invalidate_prefix("/api/policies"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_respects_path_segments() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        cache.insert(ResponseCache::key("GET", "/api/policies", ""), json!([]));
        cache.insert(ResponseCache::key("GET", "/api/policies/3", ""), json!({}));
        cache.insert(ResponseCache::key("GET", "/api/policies-archive", ""), json!([]));

        assert_eq!(cache.invalidate_prefix("/api/policies"), 2);
        assert!(cache.get(&key("/api/policies-archive")).is_some());
        assert!(cache.get(&key("/api/policies/3")).is_none());

        cache.insert(ResponseCache::key("GET", "/api/policies/4", ""), json!({}));
        assert_eq!(cache.invalidate_prefix("/api/policies/"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        assert_eq!(ResponseCache::new(0, Duration::ZERO).capacity(), 1);
    }
}
