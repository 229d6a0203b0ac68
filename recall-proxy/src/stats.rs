//! Hit/miss accounting as an `on_cached` hook.

use async_trait::async_trait;
use recall_core::{CacheKey, CachedOutcome, OnCached, RecallResult};
use recall_storage::CacheStats;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts what happens at the `on_cached` step of every call.
///
/// On its own it returns [`CachedOutcome::Pass`]. Wrapping another hook with
/// [`StatsHook::wrapping`] counts that hook's decisions instead: a `Skip`
/// counts as a miss, `Data` as provided.
///
/// Install with `on_cached_shared` to keep a handle for reading counts.
#[derive(Default)]
pub struct StatsHook {
    hits: AtomicU64,
    misses: AtomicU64,
    provided: AtomicU64,
    inner: Option<Arc<dyn OnCached>>,
}

impl StatsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the outcomes of `inner`.
    pub fn wrapping(inner: Arc<dyn OnCached>) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Calls answered by the wrapped hook's `Data` outcome.
    pub fn provided(&self) -> u64 {
        self.provided.load(Ordering::Relaxed)
    }

    /// Counts so far as store-style statistics.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
            ..CacheStats::default()
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.provided.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for StatsHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsHook")
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .field("provided", &self.provided())
            .field("wrapping", &self.inner.is_some())
            .finish()
    }
}

#[async_trait]
impl OnCached for StatsHook {
    async fn on_cached(
        &self,
        key: &CacheKey,
        cached: Option<&Value>,
    ) -> RecallResult<CachedOutcome> {
        let outcome = match &self.inner {
            Some(inner) => inner.on_cached(key, cached).await?,
            None => CachedOutcome::Pass,
        };

        let counter = match (&outcome, cached) {
            (CachedOutcome::Data(_), _) => &self.provided,
            (CachedOutcome::Pass, Some(_)) => &self.hits,
            _ => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }
}
