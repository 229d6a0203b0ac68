//! recall - transparent memoization proxy
//!
//! Wrap any [`CacheTarget`] and every method call is answered from a
//! [`CacheStore`] when the same method was already called with the same
//! arguments. Nested objects are wrapped on access with a dotted key prefix;
//! plain properties pass through untouched.
//!
//! ```ignore
//! use recall_proxy::{cache_proxy, MemoryStore, ProxyOptions, TargetBuilder};
//!
//! let target = TargetBuilder::new()
//!     .method("getValue", |args| {
//!         let x = args.first().and_then(Value::as_i64).unwrap_or(0);
//!         Ok(json!(x * 2))
//!     })
//!     .build();
//!
//! let proxy = cache_proxy(ProxyOptions::new(Arc::new(MemoryStore::new()))).wrap(target);
//! assert_eq!(proxy.call("getValue", vec![json!(5)]).await?, json!(10)); // computed
//! assert_eq!(proxy.call("getValue", vec![json!(5)]).await?, json!(10)); // cached
//! ```
//!
//! Concurrent first calls with the same key are not coalesced: each one
//! misses, invokes the method and writes.

pub mod factory;
pub mod options;
pub mod proxy;
pub mod stats;
pub mod telemetry;

pub use factory::{cache_proxy, ProxyFactory};
pub use options::ProxyOptions;
pub use proxy::{Access, CachedMethod, CachedProxy};
pub use stats::StatsHook;
pub use telemetry::{init_tracing, TelemetryConfig};

pub use recall_core::{
    on_cached_fn, on_fetched_fn, CacheKey, CacheTarget, CachedOutcome, ConfigError,
    FetchedOutcome, InstanceRegistry, Member, OnCached, OnFetched, ProxyConfig, ProxyError,
    RecallError, RecallResult, TargetBuilder, Value,
};
pub use recall_storage::{CacheStats, CacheStore, LmdbStore, LmdbStoreConfig, MemoryStore};
