//! Failures propagate verbatim and never leave partial writes.

use recall_proxy::{
    cache_proxy, CacheStore, ProxyError, ProxyOptions, RecallError, TargetBuilder,
};
use recall_test_utils::assertions::{assert_store_error, assert_target_error};
use recall_test_utils::fixtures::calculator_target;
use recall_test_utils::{CallCounter, CountingStore, FailOn, FailingStore, TargetError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn target_error_propagates_and_is_not_cached() {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(store.clone())).wrap(calculator_target(&counter));

    let first = proxy.call("fail", vec![]).await;
    assert_eq!(
        first.unwrap_err(),
        RecallError::method_failed("fail", "calculator is broken")
    );
    let second = proxy.call("fail", vec![]).await;
    assert_target_error(&second);

    assert_eq!(counter.count(), 2, "errors are retried by the next caller, not cached");
    assert_eq!(store.sets(), 0);
}

#[tokio::test]
async fn invalid_arguments_surface_as_target_errors() {
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(Arc::new(CountingStore::in_memory())))
        .wrap(calculator_target(&counter));

    let err = proxy.call("add", vec![json!("one")]).await.unwrap_err();
    assert!(matches!(
        err,
        RecallError::Target(TargetError::InvalidArguments { ref method, .. }) if method == "add"
    ));
}

#[tokio::test]
async fn recovers_after_transient_target_failure() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let target = TargetBuilder::new()
        .method("flaky", move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RecallError::method_failed("flaky", "first attempt fails"))
            } else {
                Ok(json!("ok"))
            }
        })
        .build();
    let proxy = cache_proxy(ProxyOptions::new(Arc::new(CountingStore::in_memory()))).wrap(target);

    assert!(proxy.call("flaky", vec![]).await.is_err());
    assert_eq!(proxy.call("flaky", vec![]).await.unwrap(), json!("ok"));
    assert_eq!(proxy.call("flaky", vec![]).await.unwrap(), json!("ok"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn store_read_failure_aborts_before_invocation() {
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(Arc::new(FailingStore::new(FailOn::Get))))
        .wrap(calculator_target(&counter));

    let result = proxy.call("getValue", vec![json!(1)]).await;
    assert_eq!(result.clone().unwrap_err(), FailingStore::error());
    assert_store_error(&result);
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn store_write_failure_propagates_after_invocation() {
    let counter = CallCounter::new();
    let store = Arc::new(FailingStore::new(FailOn::Set));
    let proxy = cache_proxy(ProxyOptions::new(store.clone())).wrap(calculator_target(&counter));

    let result = proxy.call("getValue", vec![json!(1)]).await;
    assert_store_error(&result);
    assert_eq!(counter.count(), 1);
    assert!(store.inner().is_empty());
}

#[tokio::test]
async fn plain_values_ignore_a_broken_store() {
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(Arc::new(FailingStore::new(FailOn::Get))))
        .wrap(calculator_target(&counter));

    assert_eq!(proxy.value("version").unwrap(), json!("1.2.0"));
}

#[tokio::test]
async fn navigation_errors_name_the_full_path() {
    let counter = CallCounter::new();
    let store = Arc::new(CountingStore::in_memory());
    let proxy = cache_proxy(ProxyOptions::new(store.clone()).with_prefix("app:"))
        .wrap(recall_test_utils::fixtures::nested_api_target(&counter));

    assert_eq!(
        proxy.call_path("api.baseUrl", vec![]).await.unwrap_err(),
        RecallError::Proxy(ProxyError::NotCallable {
            path: "app:api.baseUrl".to_string()
        })
    );
    assert_eq!(
        proxy.call_path("ping.deeper", vec![]).await.unwrap_err(),
        RecallError::Proxy(ProxyError::NotAnObject {
            path: "app:ping".to_string()
        })
    );
    assert_eq!(
        proxy.child("api").unwrap().value("v2").unwrap_err(),
        RecallError::Proxy(ProxyError::NotAValue {
            path: "app:api.v2".to_string()
        })
    );
    assert!(store.untouched());
    assert_eq!(store.inner().stats().await.unwrap().entry_count, 0);
}
