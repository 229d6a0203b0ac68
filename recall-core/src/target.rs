//! The cacheable call capability.
//!
//! A proxy never reflects over arbitrary types. Instead the wrapped object
//! implements [`CacheTarget`]: it declares its members by name and answers
//! `invoke(method, args)` for the callable ones. Nested sub-objects are
//! themselves `CacheTarget`s, so the member graph is an explicit, finite
//! schema.
//!
//! [`TargetBuilder`] assembles a target from closures for the common case
//! where writing a full adapter type is overkill.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::{ProxyError, RecallResult};

/// How a named member of a target is exposed.
#[derive(Clone)]
pub enum Member {
    /// A callable method, dispatched through [`CacheTarget::invoke`].
    Method,
    /// A nested object, wrapped lazily with an extended key prefix.
    Object(Arc<dyn CacheTarget>),
    /// A plain property returned verbatim, never cached.
    Value(Value),
}

impl Member {
    /// Short label used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Member::Method => "method",
            Member::Object(_) => "object",
            Member::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method => f.write_str("Method"),
            Member::Object(_) => f.write_str("Object(..)"),
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// An object whose methods can be intercepted and cached.
///
/// Implementations must be thread-safe. `invoke` is only called for names
/// that `member` reports as [`Member::Method`].
#[async_trait]
pub trait CacheTarget: Send + Sync {
    /// Look up a member by name. `None` means the member does not exist.
    fn member(&self, name: &str) -> Option<Member>;

    /// Invoke the method `name` with `args`.
    async fn invoke(&self, name: &str, args: Vec<Value>) -> RecallResult<Value>;

    /// Names of all members, for diagnostics.
    fn member_names(&self) -> Vec<String> {
        Vec::new()
    }
}

type MethodFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, RecallResult<Value>> + Send + Sync>;

enum Slot {
    Method(MethodFn),
    Object(Arc<dyn CacheTarget>),
    Value(Value),
}

/// A [`CacheTarget`] assembled from closures by [`TargetBuilder`].
pub struct MethodTable {
    slots: BTreeMap<String, Slot>,
}

#[async_trait]
impl CacheTarget for MethodTable {
    fn member(&self, name: &str) -> Option<Member> {
        self.slots.get(name).map(|slot| match slot {
            Slot::Method(_) => Member::Method,
            Slot::Object(target) => Member::Object(Arc::clone(target)),
            Slot::Value(value) => Member::Value(value.clone()),
        })
    }

    async fn invoke(&self, name: &str, args: Vec<Value>) -> RecallResult<Value> {
        match self.slots.get(name) {
            Some(Slot::Method(method)) => (**method)(args).await,
            Some(_) => Err(ProxyError::NotCallable {
                path: name.to_string(),
            }
            .into()),
            None => Err(ProxyError::UnknownMember {
                path: name.to_string(),
            }
            .into()),
        }
    }

    fn member_names(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }
}

/// Builder for [`MethodTable`] targets.
///
/// ```ignore
/// let target = TargetBuilder::new()
///     .method("getValue", |args| {
///         let x = args.first().and_then(Value::as_i64).unwrap_or(0);
///         Ok(json!(x * 2))
///     })
///     .value("version", json!("1.2.0"))
///     .build();
/// ```
#[derive(Default)]
pub struct TargetBuilder {
    slots: BTreeMap<String, Slot>,
}

impl TargetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous method. Its result is lifted into a future.
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> RecallResult<Value> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let method: MethodFn = Arc::new(move |args| {
            let f = Arc::clone(&f);
            async move { (*f)(args) }.boxed()
        });
        self.slots.insert(name.into(), Slot::Method(method));
        self
    }

    /// Register an asynchronous method.
    pub fn async_method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RecallResult<Value>> + Send + 'static,
    {
        let method: MethodFn = Arc::new(move |args| f(args).boxed());
        self.slots.insert(name.into(), Slot::Method(method));
        self
    }

    /// Register a nested object.
    pub fn object(mut self, name: impl Into<String>, target: Arc<dyn CacheTarget>) -> Self {
        self.slots.insert(name.into(), Slot::Object(target));
        self
    }

    /// Register a plain property.
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.slots.insert(name.into(), Slot::Value(value));
        self
    }

    /// Finish the table.
    pub fn build(self) -> Arc<dyn CacheTarget> {
        Arc::new(MethodTable { slots: self.slots })
    }
}
