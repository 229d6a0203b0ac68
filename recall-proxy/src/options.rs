//! Wrap configuration shared by a proxy and everything nested under it.

use recall_core::{child_prefix, OnCached, OnFetched, ProxyConfig};
use recall_storage::CacheStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Store, default TTL, key prefix and hooks for a family of proxies.
///
/// Cloning is cheap: the store and hooks are shared.
///
/// # Example
///
/// ```ignore
/// let options = ProxyOptions::new(Arc::new(MemoryStore::new()))
///     .with_ttl(Duration::from_secs(60))
///     .with_prefix("app:")
///     .on_fetched(on_fetched_fn(|_key, value| async move {
///         if value.is_null() {
///             Ok(FetchedOutcome::Skip)
///         } else {
///             Ok(FetchedOutcome::Pass)
///         }
///     }));
/// ```
#[derive(Clone)]
pub struct ProxyOptions {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
    prefix: String,
    on_cached: Option<Arc<dyn OnCached>>,
    on_fetched: Option<Arc<dyn OnFetched>>,
}

impl ProxyOptions {
    /// Options over `store` with no TTL, empty prefix and no hooks.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: None,
            prefix: String::new(),
            on_cached: None,
            on_fetched: None,
        }
    }

    /// Options over `store` with the TTL and prefix from `config`.
    pub fn from_config(store: Arc<dyn CacheStore>, config: &ProxyConfig) -> Self {
        let mut options = Self::new(store).with_prefix(config.prefix.clone());
        options.ttl = config.default_ttl;
        options
    }

    /// Default TTL for stored results. Zero means no expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Prefix for every key derived by the root proxy.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Install the hook run after every store lookup.
    pub fn on_cached(self, hook: impl OnCached + 'static) -> Self {
        self.on_cached_shared(Arc::new(hook))
    }

    /// Install an `on_cached` hook the caller keeps a handle to.
    pub fn on_cached_shared(mut self, hook: Arc<dyn OnCached>) -> Self {
        self.on_cached = Some(hook);
        self
    }

    /// Install the hook run after every fresh computation.
    pub fn on_fetched(self, hook: impl OnFetched + 'static) -> Self {
        self.on_fetched_shared(Arc::new(hook))
    }

    /// Install an `on_fetched` hook the caller keeps a handle to.
    pub fn on_fetched_shared(mut self, hook: Arc<dyn OnFetched>) -> Self {
        self.on_fetched = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn cached_hook(&self) -> Option<&Arc<dyn OnCached>> {
        self.on_cached.as_ref()
    }

    pub(crate) fn fetched_hook(&self) -> Option<&Arc<dyn OnFetched>> {
        self.on_fetched.as_ref()
    }

    /// Same store, TTL and hooks under `prefix + name + "."`.
    pub(crate) fn descend(&self, name: &str) -> Self {
        Self {
            prefix: child_prefix(&self.prefix, name),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ProxyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyOptions")
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .field("prefix", &self.prefix)
            .field("on_cached", &self.on_cached.is_some())
            .field("on_fetched", &self.on_fetched.is_some())
            .finish()
    }
}
