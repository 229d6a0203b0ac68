//! recall core - keys, hooks, targets and errors
//!
//! Pure building blocks shared by every other recall crate:
//!
//! - [`CacheKey`]: deterministic `prefix + method(args)` key derivation
//! - [`CachedOutcome`] / [`FetchedOutcome`]: the hook protocol as tagged enums
//! - [`CacheTarget`]: the capability a wrapped object implements
//! - [`ProxyConfig`]: env-driven defaults for TTL and prefix
//! - [`InstanceRegistry`]: initialize-once named instances
//! - [`RecallError`]: the error taxonomy

pub mod config;
pub mod error;
pub mod hooks;
pub mod key;
pub mod registry;
pub mod target;

pub use config::{parse_ttl_ms, ProxyConfig, ENV_DEFAULT_TTL_MS, ENV_KEY_PREFIX};
pub use error::{
    ConfigError, HookError, ProxyError, RecallError, RecallResult, RegistryError, StoreError,
    TargetError,
};
pub use hooks::{
    on_cached_fn, on_fetched_fn, CachedHookFn, CachedOutcome, FetchedHookFn, FetchedOutcome,
    Lookup, OnCached, OnFetched, StorePlan,
};
pub use key::{child_prefix, CacheKey, PATH_SEPARATOR};
pub use registry::InstanceRegistry;
pub use target::{CacheTarget, Member, MethodTable, TargetBuilder};

// Values flowing through proxies are JSON documents.
pub use serde_json::Value;
