//! In-memory response cache for GET requests
//!
//! Entries are stored with the time they were written and checked for expiry
//! when read. Nothing is purged proactively: a stale entry stays in the map
//! until the same key is written again.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

/// Freshness window used when a cached GET does not specify one
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_millis(5000);

/// A cached response body
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The parsed response body
    data: Value,
    /// When the entry was written, in clock milliseconds
    timestamp: f64,
}

/// Result of reading from the cache, including freshness metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData {
    /// The cached response body
    pub data: Value,
    /// When the entry was written, in clock milliseconds
    pub cached_at: f64,
    /// Whether the entry is older than the requested freshness window
    pub is_expired: bool,
}

/// Map of cache key to response body
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache key for a GET of `url`
    pub fn key(url: &str) -> String {
        format!("GET:{}", url)
    }

    /// Reads an entry, reporting whether it is older than `max_age`
    ///
    /// An entry is fresh while `now - cached_at < max_age`.
    pub fn read(&self, key: &str, now_ms: f64, max_age: Duration) -> Option<CachedData> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        let age = now_ms - entry.timestamp;

        Some(CachedData {
            data: entry.data.clone(),
            cached_at: entry.timestamp,
            is_expired: age >= max_age.as_secs_f64() * 1000.0,
        })
    }

    /// Stores `data` under `key`, replacing any previous entry
    pub fn write(&self, key: &str, data: Value, now_ms: f64) {
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: now_ms,
            },
        );
    }

    /// Number of entries, fresh or stale
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        assert_eq!(
            ResponseCache::key("https://api.test/users"),
            "GET:https://api.test/users"
        );
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let cache = ResponseCache::new();
        assert!(cache.read("GET:x", 0.0, DEFAULT_CACHE_DURATION).is_none());
    }

    #[test]
    fn test_read_is_fresh_inside_window() {
        let cache = ResponseCache::new();
        cache.write("GET:x", json!({"v": 1}), 1000.0);

        let result = cache
            .read("GET:x", 5999.0, DEFAULT_CACHE_DURATION)
            .expect("Entry should exist");

        assert_eq!(result.data, json!({"v": 1}));
        assert_eq!(result.cached_at, 1000.0);
        assert!(!result.is_expired);
    }

    #[test]
    fn test_read_is_expired_at_window_boundary() {
        let cache = ResponseCache::new();
        cache.write("GET:x", json!(1), 1000.0);

        let result = cache.read("GET:x", 6000.0, DEFAULT_CACHE_DURATION).unwrap();

        assert!(result.is_expired, "Age equal to the window is stale");
    }

    #[test]
    fn test_stale_entries_are_not_purged() {
        let cache = ResponseCache::new();
        cache.write("GET:x", json!(1), 0.0);

        let _ = cache.read("GET:x", 1_000_000.0, Duration::from_millis(10));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let cache = ResponseCache::new();
        cache.write("GET:x", json!("first"), 0.0);
        cache.write("GET:x", json!("second"), 100.0);

        let result = cache.read("GET:x", 100.0, DEFAULT_CACHE_DURATION).unwrap();

        assert_eq!(result.data, json!("second"));
        assert_eq!(result.cached_at, 100.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_per_read_window() {
        let cache = ResponseCache::new();
        cache.write("GET:x", json!(1), 0.0);

        assert!(!cache.read("GET:x", 50.0, Duration::from_millis(100)).unwrap().is_expired);
        assert!(cache.read("GET:x", 50.0, Duration::from_millis(20)).unwrap().is_expired);
    }
}
