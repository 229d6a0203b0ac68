//! Cache store capability and statistics.
//!
//! The proxy layer needs nothing from a store beyond `get` and `set` with an
//! optional TTL. The remaining operations exist for administration and
//! tests.

use async_trait::async_trait;
use recall_core::RecallResult;
use serde_json::Value;
use std::time::Duration;

/// Key-value store with per-entry expiry.
///
/// Implementations must be thread-safe. A stored JSON `null` is a value:
/// `get` returns `Some(Value::Null)` for it and `None` only when there is no
/// unexpired entry.
///
/// # TTL
///
/// `set(key, value, None)` stores without expiry. A zero TTL is also
/// treated as no expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Get the unexpired value under `key`.
    async fn get(&self, key: &str) -> RecallResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> RecallResult<()>;

    /// Remove `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> RecallResult<bool>;

    /// Remove every entry owned by this store. Returns how many were removed.
    async fn clear(&self) -> RecallResult<u64>;

    /// Usage statistics.
    async fn stats(&self) -> RecallResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// Number of entries currently in the store.
    pub entry_count: u64,
    /// Number of entries evicted because they expired.
    pub evictions: u64,
    /// Number of writes.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
