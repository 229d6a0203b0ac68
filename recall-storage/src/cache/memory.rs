//! In-process cache store.
//!
//! Entries live in a `HashMap` behind an `RwLock`. Expired entries read as
//! absent and are evicted on the read that notices them; `purge_expired`
//! sweeps the rest.

use async_trait::async_trait;
use chrono::Utc;
use recall_core::{RecallResult, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use super::expiry::Expiry;
use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    expiry: Expiry,
}

/// Thread-safe in-memory store with per-entry TTL.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    stats: RwLock<CacheStats>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub fn purge_expired(&self) -> RecallResult<u64> {
        let now = Utc::now();
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.expiry.is_expired(now));
        let evicted = (before - entries.len()) as u64;
        drop(entries);

        if evicted > 0 {
            tracing::debug!(evicted, "Purged expired entries");
            self.update_stats(|stats| {
                stats.evictions += evicted;
                stats.entry_count = stats.entry_count.saturating_sub(evicted);
            });
        }
        Ok(evicted)
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time left before `key` expires. `Ok(None)` for missing or non-expiring entries.
    pub fn ttl_remaining(&self, key: &str) -> RecallResult<Option<Duration>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries
            .get(key)
            .and_then(|entry| entry.expiry.remaining(Utc::now())))
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> RecallResult<Option<Value>> {
        let now = Utc::now();
        let found = {
            let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
            entries.get(key).cloned()
        };

        match found {
            Some(entry) if !entry.expiry.is_expired(now) => {
                self.update_stats(|stats| stats.hits += 1);
                Ok(Some(entry.value))
            }
            Some(_) => {
                let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
                // Re-check: a concurrent set may have refreshed the entry.
                let still_expired = entries
                    .get(key)
                    .map(|entry| entry.expiry.is_expired(now))
                    .unwrap_or(false);
                if still_expired {
                    entries.remove(key);
                    drop(entries);
                    tracing::debug!(key, "Evicted expired entry");
                    self.update_stats(|stats| {
                        stats.misses += 1;
                        stats.evictions += 1;
                        stats.entry_count = stats.entry_count.saturating_sub(1);
                    });
                    Ok(None)
                } else {
                    let value = entries.get(key).map(|entry| entry.value.clone());
                    drop(entries);
                    match value {
                        Some(value) => {
                            self.update_stats(|stats| stats.hits += 1);
                            Ok(Some(value))
                        }
                        None => {
                            self.update_stats(|stats| stats.misses += 1);
                            Ok(None)
                        }
                    }
                }
            }
            None => {
                self.update_stats(|stats| stats.misses += 1);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> RecallResult<()> {
        let entry = MemoryEntry {
            value,
            expiry: Expiry::from_ttl(ttl, Utc::now()),
        };
        let is_new = {
            let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
            entries.insert(key.to_string(), entry).is_none()
        };
        self.update_stats(|stats| {
            stats.writes += 1;
            if is_new {
                stats.entry_count += 1;
            }
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> RecallResult<bool> {
        let removed = {
            let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
            entries.remove(key).is_some()
        };
        if removed {
            self.update_stats(|stats| stats.entry_count = stats.entry_count.saturating_sub(1));
        }
        Ok(removed)
    }

    async fn clear(&self) -> RecallResult<u64> {
        let removed = {
            let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
            let count = entries.len() as u64;
            entries.clear();
            count
        };
        tracing::debug!(removed, "Cleared memory store");
        self.update_stats(|stats| stats.entry_count = 0);
        Ok(removed)
    }

    async fn stats(&self) -> RecallResult<CacheStats> {
        Ok(self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
