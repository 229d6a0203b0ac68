//! Cached proxies over [`CacheTarget`]s.
//!
//! A [`CachedProxy`] exposes the members of its target unchanged in shape:
//! methods become [`CachedMethod`]s that consult the store first, nested
//! objects become proxies with an extended prefix, and plain values are
//! handed back as-is.
//!
//! # Call sequence
//!
//! 1. Derive `prefix + method(args)`
//! 2. `store.get(key)`
//! 3. `on_cached(key, cached)`: may answer the call or force a miss
//! 4. On a hit, return the cached value
//! 5. Invoke the target method
//! 6. `on_fetched(key, fresh)`: may substitute the value or skip storing
//! 7. `store.set(key, value, ttl)` and return
//!
//! Every step is awaited in order. Any error aborts the call as-is.

use recall_core::{
    CacheKey, CacheTarget, CachedOutcome, FetchedOutcome, Lookup, Member, ProxyError,
    RecallResult, StorePlan, PATH_SEPARATOR,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::options::ProxyOptions;

/// How a member of a proxied target is exposed.
#[derive(Debug, Clone)]
pub enum Access {
    /// A method whose results are cached.
    Method(CachedMethod),
    /// A nested object, proxied under `prefix + name + "."`.
    Object(CachedProxy),
    /// A plain property, never cached.
    Value(Value),
}

/// A target wrapped so its method results are memoized.
#[derive(Clone)]
pub struct CachedProxy {
    target: Arc<dyn CacheTarget>,
    options: ProxyOptions,
}

impl CachedProxy {
    /// Wrap `target` with `options`. The root prefix is `options.prefix()`.
    pub fn new(target: Arc<dyn CacheTarget>, options: ProxyOptions) -> Self {
        Self { target, options }
    }

    /// Look up a member. `None` if the target has no member `name`.
    ///
    /// Nested proxies are built fresh on every access.
    pub fn get(&self, name: &str) -> Option<Access> {
        let member = self.target.member(name)?;
        tracing::trace!(
            member = %self.path_of(name),
            kind = member.kind(),
            "Resolved member"
        );
        Some(match member {
            Member::Method => Access::Method(CachedMethod {
                target: Arc::clone(&self.target),
                options: self.options.clone(),
                name: name.to_string(),
            }),
            Member::Object(nested) => {
                Access::Object(CachedProxy::new(nested, self.options.descend(name)))
            }
            Member::Value(value) => Access::Value(value),
        })
    }

    /// Call the method `name` through the cache.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> RecallResult<Value> {
        self.method(name)?.invoke(args).await
    }

    /// Call the method `name` and decode its result.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> RecallResult<T> {
        let value = self.call(name, args).await?;
        serde_json::from_value(value).map_err(|e| {
            ProxyError::ResultDecode {
                path: self.path_of(name),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Call a method through a dotted path of nested objects, e.g. `"api.getData"`.
    pub async fn call_path(&self, path: &str, args: Vec<Value>) -> RecallResult<Value> {
        let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let method = segments.pop().unwrap_or_default();

        let mut proxy = self.clone();
        for segment in segments {
            proxy = proxy.child(segment)?;
        }
        proxy.call(method, args).await
    }

    /// The proxy for the nested object `name`.
    pub fn child(&self, name: &str) -> RecallResult<CachedProxy> {
        match self.require(name)? {
            Access::Object(proxy) => Ok(proxy),
            _ => Err(ProxyError::NotAnObject {
                path: self.path_of(name),
            }
            .into()),
        }
    }

    /// The plain property `name`.
    pub fn value(&self, name: &str) -> RecallResult<Value> {
        match self.require(name)? {
            Access::Value(value) => Ok(value),
            _ => Err(ProxyError::NotAValue {
                path: self.path_of(name),
            }
            .into()),
        }
    }

    /// The cached method `name`.
    pub fn method(&self, name: &str) -> RecallResult<CachedMethod> {
        match self.require(name)? {
            Access::Method(method) => Ok(method),
            _ => Err(ProxyError::NotCallable {
                path: self.path_of(name),
            }
            .into()),
        }
    }

    /// The key a call to `name` with `args` reads and writes.
    pub fn key_for(&self, name: &str, args: &[Value]) -> CacheKey {
        CacheKey::derive(self.options.prefix(), name, args)
    }

    /// Key prefix of this proxy.
    pub fn prefix(&self) -> &str {
        self.options.prefix()
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub fn target(&self) -> &Arc<dyn CacheTarget> {
        &self.target
    }

    fn require(&self, name: &str) -> RecallResult<Access> {
        self.get(name).ok_or_else(|| {
            ProxyError::UnknownMember {
                path: self.path_of(name),
            }
            .into()
        })
    }

    fn path_of(&self, name: &str) -> String {
        format!("{}{}", self.options.prefix(), name)
    }
}

impl fmt::Debug for CachedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedProxy")
            .field("members", &self.target.member_names())
            .field("options", &self.options)
            .finish()
    }
}

/// One method of a proxied target.
#[derive(Clone)]
pub struct CachedMethod {
    target: Arc<dyn CacheTarget>,
    options: ProxyOptions,
    name: String,
}

impl CachedMethod {
    /// Method name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key a call with `args` reads and writes.
    pub fn key_for(&self, args: &[Value]) -> CacheKey {
        CacheKey::derive(self.options.prefix(), &self.name, args)
    }

    /// Run the call through the cache.
    pub async fn invoke(&self, args: Vec<Value>) -> RecallResult<Value> {
        let key = self.key_for(&args);
        tracing::trace!(key = %key, "Derived cache key");

        let store = self.options.store();
        let cached = store.get(key.as_str()).await?;

        let outcome = match self.options.cached_hook() {
            Some(hook) => hook.on_cached(&key, cached.as_ref()).await?,
            None => CachedOutcome::Pass,
        };

        match outcome.resolve(cached) {
            Lookup::Hit(value) => {
                tracing::debug!(key = %key, store = store.name(), "Cache hit");
                return Ok(value);
            }
            Lookup::Provided(value) => {
                tracing::debug!(key = %key, "on_cached hook supplied the result");
                return Ok(value);
            }
            Lookup::Miss => {
                tracing::debug!(key = %key, store = store.name(), "Cache miss");
            }
        }

        let fresh = self.target.invoke(&self.name, args).await?;

        let outcome = match self.options.fetched_hook() {
            Some(hook) => hook.on_fetched(&key, &fresh).await?,
            None => FetchedOutcome::Pass,
        };

        match outcome.resolve(fresh, self.options.ttl()) {
            StorePlan::Store { value, ttl } => {
                store.set(key.as_str(), value.clone(), ttl).await?;
                Ok(value)
            }
            StorePlan::Return(value) => {
                tracing::debug!(key = %key, "on_fetched hook skipped the store");
                Ok(value)
            }
        }
    }
}

impl fmt::Debug for CachedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMethod")
            .field("name", &self.name)
            .field("prefix", &self.options.prefix())
            .finish()
    }
}
