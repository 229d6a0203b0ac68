//! Hook protocol for intercepted calls.
//!
//! Two optional extension points surround every cached call:
//!
//! - `on_cached` runs after the store lookup on every call, hit or miss. It
//!   sees the looked-up value (or `None`) and may pass it through, force a
//!   miss, or answer the call itself.
//! - `on_fetched` runs only after a fresh computation. It may store the
//!   result as-is, store a substitute (optionally with its own TTL), or
//!   keep the result out of the store.
//!
//! Both are awaited in sequence. An error from either aborts the call and
//! nothing is written to the store.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::{CacheKey, RecallResult};

// ============================================================================
// OUTCOMES
// ============================================================================

/// What an `on_cached` hook decided.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CachedOutcome {
    /// Use the looked-up value (or miss) unchanged.
    #[default]
    Pass,
    /// Treat the call as a miss even if the store had a value.
    Skip,
    /// Answer the call with this value, touching neither store nor target.
    Data(Value),
}

/// What an `on_fetched` hook decided.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchedOutcome {
    /// Store the fresh result with the default TTL.
    #[default]
    Pass,
    /// Return the fresh result without storing it.
    Skip,
    /// Store `data` instead of the fresh result and return it.
    /// A `None` TTL keeps the configured default.
    Override { data: Value, ttl: Option<Duration> },
}

impl FetchedOutcome {
    /// Store `data` with the default TTL.
    pub fn store(data: Value) -> Self {
        FetchedOutcome::Override { data, ttl: None }
    }

    /// Store `data` with an explicit TTL.
    pub fn store_for(data: Value, ttl: Duration) -> Self {
        FetchedOutcome::Override {
            data,
            ttl: Some(ttl),
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Result of combining a store lookup with the `on_cached` outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The store had a value and the hook let it through.
    Hit(Value),
    /// The hook supplied the answer directly.
    Provided(Value),
    /// Nothing usable: the target must be invoked.
    Miss,
}

impl CachedOutcome {
    /// Apply this outcome to the looked-up value.
    pub fn resolve(self, cached: Option<Value>) -> Lookup {
        match self {
            CachedOutcome::Data(value) => Lookup::Provided(value),
            CachedOutcome::Skip => Lookup::Miss,
            CachedOutcome::Pass => match cached {
                Some(value) => Lookup::Hit(value),
                None => Lookup::Miss,
            },
        }
    }
}

/// What to do with a freshly computed value.
#[derive(Debug, Clone, PartialEq)]
pub enum StorePlan {
    /// Write `value` under the key with `ttl`, then return it.
    Store { value: Value, ttl: Option<Duration> },
    /// Return `value` without writing.
    Return(Value),
}

impl StorePlan {
    /// The value the caller will receive.
    pub fn value(&self) -> &Value {
        match self {
            StorePlan::Store { value, .. } | StorePlan::Return(value) => value,
        }
    }
}

impl FetchedOutcome {
    /// Apply this outcome to a fresh result.
    pub fn resolve(self, fresh: Value, default_ttl: Option<Duration>) -> StorePlan {
        match self {
            FetchedOutcome::Pass => StorePlan::Store {
                value: fresh,
                ttl: default_ttl,
            },
            FetchedOutcome::Skip => StorePlan::Return(fresh),
            FetchedOutcome::Override { data, ttl } => StorePlan::Store {
                value: data,
                ttl: ttl.or(default_ttl),
            },
        }
    }
}

// ============================================================================
// HOOK TRAITS
// ============================================================================

/// Hook invoked after every store lookup.
#[async_trait]
pub trait OnCached: Send + Sync {
    /// Inspect the lookup for `key`. `cached` is `None` on a miss.
    async fn on_cached(&self, key: &CacheKey, cached: Option<&Value>)
        -> RecallResult<CachedOutcome>;
}

/// Hook invoked after a fresh computation.
#[async_trait]
pub trait OnFetched: Send + Sync {
    /// Inspect the fresh result computed for `key`.
    async fn on_fetched(&self, key: &CacheKey, fresh: &Value) -> RecallResult<FetchedOutcome>;
}

/// Adapter turning an async closure into an [`OnCached`] hook.
pub struct CachedHookFn<F> {
    f: F,
}

/// Adapter turning an async closure into an [`OnFetched`] hook.
pub struct FetchedHookFn<F> {
    f: F,
}

/// Build an `on_cached` hook from `Fn(CacheKey, Option<Value>) -> Future`.
pub fn on_cached_fn<F, Fut>(f: F) -> CachedHookFn<F>
where
    F: Fn(CacheKey, Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = RecallResult<CachedOutcome>> + Send,
{
    CachedHookFn { f }
}

/// Build an `on_fetched` hook from `Fn(CacheKey, Value) -> Future`.
pub fn on_fetched_fn<F, Fut>(f: F) -> FetchedHookFn<F>
where
    F: Fn(CacheKey, Value) -> Fut + Send + Sync,
    Fut: Future<Output = RecallResult<FetchedOutcome>> + Send,
{
    FetchedHookFn { f }
}

#[async_trait]
impl<F, Fut> OnCached for CachedHookFn<F>
where
    F: Fn(CacheKey, Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = RecallResult<CachedOutcome>> + Send,
{
    async fn on_cached(
        &self,
        key: &CacheKey,
        cached: Option<&Value>,
    ) -> RecallResult<CachedOutcome> {
        (self.f)(key.clone(), cached.cloned()).await
    }
}

#[async_trait]
impl<F, Fut> OnFetched for FetchedHookFn<F>
where
    F: Fn(CacheKey, Value) -> Fut + Send + Sync,
    Fut: Future<Output = RecallResult<FetchedOutcome>> + Send,
{
    async fn on_fetched(&self, key: &CacheKey, fresh: &Value) -> RecallResult<FetchedOutcome> {
        (self.f)(key.clone(), fresh.clone()).await
    }
}
