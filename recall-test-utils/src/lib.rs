//! recall Test Utilities
//!
//! Shared test infrastructure for the recall workspace:
//! - Instrumented and failing stores
//! - Call counters for observing how often a target really runs
//! - Ready-made targets for common scenarios
//! - Proptest generators for JSON arguments
//! - Assertions on the error taxonomy

pub use recall_core::{
    CacheKey, CacheTarget, ProxyError, RecallError, RecallResult, StoreError, TargetBuilder,
    TargetError,
};
pub use recall_storage::{CacheStats, CacheStore, MemoryStore};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CALL COUNTING
// ============================================================================

/// Shared counter incremented by fixture methods each time they really run.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation.
    pub fn tick(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Invocations so far.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MOCK STORES
// ============================================================================

/// One `set` call observed by [`CountingStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub key: String,
    pub value: Value,
    pub ttl: Option<Duration>,
}

/// Store wrapper that counts traffic and records every write.
#[derive(Debug, Default)]
pub struct CountingStore<S = MemoryStore> {
    inner: S,
    gets: AtomicUsize,
    writes: Mutex<Vec<RecordedWrite>>,
}

impl CountingStore<MemoryStore> {
    /// Counting wrapper over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: CacheStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Number of `get` calls.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls.
    pub fn sets(&self) -> usize {
        self.recorded_writes().len()
    }

    /// Every `set` call in order.
    pub fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// The last write under `key`, if any.
    pub fn last_write(&self, key: &str) -> Option<RecordedWrite> {
        self.recorded_writes().into_iter().rev().find(|w| w.key == key)
    }

    /// Whether the store saw no traffic at all.
    pub fn untouched(&self) -> bool {
        self.gets() == 0 && self.sets() == 0
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for CountingStore<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> RecallResult<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> RecallResult<()> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(RecordedWrite {
                key: key.to_string(),
                value: value.clone(),
                ttl,
            });
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> RecallResult<bool> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> RecallResult<u64> {
        self.inner.clear().await
    }

    async fn stats(&self) -> RecallResult<CacheStats> {
        self.inner.stats().await
    }
}

/// Which operations a [`FailingStore`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Get,
    Set,
}

/// Store that fails the selected operation and otherwise behaves like a
/// [`MemoryStore`].
#[derive(Debug)]
pub struct FailingStore {
    fail_on: FailOn,
    inner: MemoryStore,
}

impl FailingStore {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            fail_on,
            inner: MemoryStore::new(),
        }
    }

    /// The error every failing call returns.
    pub fn error() -> RecallError {
        StoreError::Unavailable {
            backend: "failing".to_string(),
            reason: "injected failure".to_string(),
        }
        .into()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, key: &str) -> RecallResult<Option<Value>> {
        if self.fail_on == FailOn::Get {
            return Err(Self::error());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> RecallResult<()> {
        if self.fail_on == FailOn::Set {
            return Err(Self::error());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> RecallResult<bool> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> RecallResult<u64> {
        self.inner.clear().await
    }

    async fn stats(&self) -> RecallResult<CacheStats> {
        self.inner.stats().await
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made targets. Every method ticks the given counter when it runs.

    use super::*;
    use serde_json::json;

    fn int_arg(method: &str, args: &[Value], index: usize) -> RecallResult<i64> {
        args.get(index).and_then(Value::as_i64).ok_or_else(|| {
            TargetError::InvalidArguments {
                method: method.to_string(),
                reason: format!("argument {} must be an integer", index),
            }
            .into()
        })
    }

    /// Calculator with plain values alongside its methods.
    ///
    /// - `add(a, b)`, `getValue(x)` = `x * 2`: synchronous
    /// - `multiply(a, b)`: asynchronous
    /// - `fail()`: always errors with `TargetError::MethodFailed`
    /// - `nothing()`: returns `null`
    /// - `version` = `"1.2.0"`, `precision` = `2`, `enabled` = `true`,
    ///   `label` = `null`
    pub fn calculator_target(counter: &CallCounter) -> Arc<dyn CacheTarget> {
        let add = counter.clone();
        let value = counter.clone();
        let multiply = counter.clone();
        let fail = counter.clone();
        let nothing = counter.clone();

        TargetBuilder::new()
            .method("add", move |args| {
                add.tick();
                Ok(json!(int_arg("add", &args, 0)? + int_arg("add", &args, 1)?))
            })
            .method("getValue", move |args| {
                value.tick();
                Ok(json!(int_arg("getValue", &args, 0)? * 2))
            })
            .async_method("multiply", move |args| {
                let multiply = multiply.clone();
                async move {
                    multiply.tick();
                    Ok::<_, RecallError>(json!(
                        int_arg("multiply", &args, 0)? * int_arg("multiply", &args, 1)?
                    ))
                }
            })
            .method("fail", move |_| {
                fail.tick();
                Err(RecallError::method_failed("fail", "calculator is broken"))
            })
            .method("nothing", move |_| {
                nothing.tick();
                Ok(Value::Null)
            })
            .value("version", json!("1.2.0"))
            .value("precision", json!(2))
            .value("enabled", json!(true))
            .value("label", Value::Null)
            .build()
    }

    /// Root target with a nested `api` object.
    ///
    /// - `ping()` on the root
    /// - `api.getData()`, `api.getUser(id)`, `api.baseUrl`
    /// - `api.v2.getData()`, `api.v2.status`
    pub fn nested_api_target(counter: &CallCounter) -> Arc<dyn CacheTarget> {
        let ping = counter.clone();
        let data = counter.clone();
        let user = counter.clone();
        let v2_data = counter.clone();

        let v2 = TargetBuilder::new()
            .method("getData", move |_| {
                v2_data.tick();
                Ok(json!({"version": 2, "items": []}))
            })
            .value("status", json!("beta"))
            .build();

        let api = TargetBuilder::new()
            .method("getData", move |_| {
                data.tick();
                Ok(json!("data"))
            })
            .async_method("getUser", move |args| {
                let user = user.clone();
                async move {
                    user.tick();
                    let id = int_arg("getUser", &args, 0)?;
                    Ok::<_, RecallError>(json!({"id": id, "name": format!("user-{}", id)}))
                }
            })
            .value("baseUrl", json!("https://api.example.test"))
            .object("v2", v2)
            .build();

        TargetBuilder::new()
            .method("ping", move |_| {
                ping.tick();
                Ok(json!("pong"))
            })
            .object("api", api)
            .build()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for call arguments.

    use proptest::prelude::*;
    use serde_json::{Map, Number, Value};

    /// Scalar JSON values. Floats are kept finite so they serialize.
    pub fn arb_json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            (-1.0e9f64..1.0e9f64)
                .prop_filter_map("finite", Number::from_f64)
                .prop_map(Value::Number),
            "[a-zA-Z0-9 _\\-\"\\\\]{0,16}".prop_map(Value::String),
        ]
    }

    /// Arbitrary JSON documents up to a small depth.
    pub fn arb_json_value() -> impl Strategy<Value = Value> {
        arb_json_leaf().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                    Value::Object(entries.into_iter().collect::<Map<String, Value>>())
                }),
            ]
        })
    }

    /// Argument lists of up to four values.
    pub fn arb_args() -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(arb_json_value(), 0..4)
    }

    /// Identifier-like method names.
    pub fn arb_method_name() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,12}"
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on the recall error taxonomy.

    use super::*;

    /// Assert that a result is Ok.
    pub fn assert_ok<T: std::fmt::Debug>(result: &RecallResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got {:?}", result);
    }

    /// Assert that a result is a store error.
    pub fn assert_store_error<T: std::fmt::Debug>(result: &RecallResult<T>) {
        assert!(
            matches!(result, Err(RecallError::Store(_))),
            "Expected store error, got {:?}",
            result
        );
    }

    /// Assert that a result is a target error.
    pub fn assert_target_error<T: std::fmt::Debug>(result: &RecallResult<T>) {
        assert!(
            matches!(result, Err(RecallError::Target(_))),
            "Expected target error, got {:?}",
            result
        );
    }

    /// Assert that a result is a hook error.
    pub fn assert_hook_error<T: std::fmt::Debug>(result: &RecallResult<T>) {
        assert!(
            matches!(result, Err(RecallError::Hook(_))),
            "Expected hook error, got {:?}",
            result
        );
    }

    /// Assert that a result is an unknown-member error for `path`.
    pub fn assert_unknown_member<T: std::fmt::Debug>(result: &RecallResult<T>, path: &str) {
        match result {
            Err(RecallError::Proxy(ProxyError::UnknownMember { path: p })) => {
                assert_eq!(p, path, "Unknown member path mismatch");
            }
            other => panic!("Expected unknown member {}, got {:?}", path, other),
        }
    }
}
