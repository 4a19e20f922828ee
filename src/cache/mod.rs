//! Process-wide TTL cache with prefix invalidation.
//!
//! One instance is constructed per process and shared by reference; tests
//! isolate themselves by constructing their own. Eviction is lazy: an
//! expired entry is dropped on the next `get` that touches it, which is
//! sufficient since an unaccessed expired entry has no observable effect
//! beyond retained memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

struct CacheEntry {
    data: Value,
    expires_at: Instant,
}

/// Key/value cache with per-entry expiry.
///
/// Keys follow the `domain:scope:discriminator` convention (for example
/// `personas:ws1:detail:p1`), which is what makes prefix invalidation
/// useful: one mutation busts every derived read key under its prefix.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a live entry. Expired entries are treated as absent and evicted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value for `ttl`. Always replaces the whole entry.
    pub fn set(&self, key: &str, data: Value, ttl: Duration) {
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.to_string(), entry);
    }

    /// Remove every entry whose key starts with `prefix`. Returns the
    /// number of entries removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Invalidated {} cache entries under '{}'", removed, prefix);
        }
        removed
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let cache = TtlCache::new();
        cache.set("personas:ws1:list", json!([1, 2]), Duration::from_secs(1));
        assert_eq!(cache.get("personas:ws1:list"), Some(json!([1, 2])));
    }

    #[test]
    fn test_zero_ttl_is_immediately_absent() {
        let cache = TtlCache::new();
        cache.set("k", json!("v"), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        // lazily evicted on the read above
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_replaces_whole_entry() {
        let cache = TtlCache::new();
        cache.set("k", json!({ "a": 1 }), Duration::from_secs(1));
        cache.set("k", json!({ "b": 2 }), Duration::from_secs(1));
        assert_eq!(cache.get("k"), Some(json!({ "b": 2 })));
    }

    #[test]
    fn test_prefix_invalidation_spares_other_domains() {
        let cache = TtlCache::new();
        let ttl = Duration::from_secs(1);
        cache.set("personas:ws1:list", json!("X"), ttl);
        cache.set("personas:ws1:detail:p1", json!("Y"), ttl);
        cache.set("products:ws1:list", json!("Z"), ttl);

        let removed = cache.invalidate("personas:ws1");
        assert_eq!(removed, 2);
        assert_eq!(cache.get("personas:ws1:list"), None);
        assert_eq!(cache.get("personas:ws1:detail:p1"), None);
        assert_eq!(cache.get("products:ws1:list"), Some(json!("Z")));
    }

    #[test]
    fn test_invalidate_missing_prefix_is_noop() {
        let cache = TtlCache::new();
        cache.set("personas:ws1:list", json!("X"), Duration::from_secs(1));
        assert_eq!(cache.invalidate("strategies:"), 0);
        assert_eq!(cache.get("personas:ws1:list"), Some(json!("X")));
    }

    #[test]
    fn test_separate_instances_are_isolated() {
        let a = TtlCache::new();
        let b = TtlCache::new();
        a.set("k", json!(1), Duration::from_secs(1));
        assert_eq!(b.get("k"), None);
    }
}
