//! Expiry of memoized results, with real sleeps.

use recall_proxy::{
    cache_proxy, on_fetched_fn, CachedProxy, FetchedOutcome, ProxyConfig, ProxyOptions,
    RecallError,
};
use recall_test_utils::fixtures::calculator_target;
use recall_test_utils::{CallCounter, CountingStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn with_ttl(ttl: Duration) -> (CachedProxy, Arc<CountingStore>, CallCounter) {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let proxy =
        cache_proxy(ProxyOptions::new(store.clone()).with_ttl(ttl)).wrap(calculator_target(&counter));
    (proxy, store, counter)
}

#[tokio::test]
async fn entry_is_served_until_ttl_elapses() {
    let (proxy, store, counter) = with_ttl(Duration::from_millis(100));

    proxy.call("getValue", vec![json!(5)]).await.unwrap();
    assert_eq!(
        store.last_write("getValue(5)").unwrap().ttl,
        Some(Duration::from_millis(100))
    );

    proxy.call("getValue", vec![json!(5)]).await.unwrap();
    assert_eq!(counter.count(), 1, "read before expiry is a hit");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(proxy.call("getValue", vec![json!(5)]).await.unwrap(), json!(10));
    assert_eq!(counter.count(), 2, "read after expiry recomputes");

    proxy.call("getValue", vec![json!(5)]).await.unwrap();
    assert_eq!(counter.count(), 2, "the recomputed entry is cached again");
}

#[tokio::test]
async fn no_ttl_means_entries_persist() {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(store.clone())).wrap(calculator_target(&counter));

    proxy.call("add", vec![json!(1), json!(1)]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    proxy.call("add", vec![json!(1), json!(1)]).await.unwrap();

    assert_eq!(counter.count(), 1);
    assert_eq!(store.last_write("add(1,1)").unwrap().ttl, None);
}

#[tokio::test]
async fn hook_ttl_overrides_default() {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let options = ProxyOptions::new(store.clone())
        .with_ttl(Duration::from_secs(3600))
        .on_fetched(on_fetched_fn(|_key, fresh| async move {
            Ok::<_, RecallError>(FetchedOutcome::store_for(fresh, Duration::from_millis(60)))
        }));
    let proxy = cache_proxy(options).wrap(calculator_target(&counter));

    proxy.call("getValue", vec![json!(1)]).await.unwrap();
    proxy.call("getValue", vec![json!(1)]).await.unwrap();
    assert_eq!(counter.count(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    proxy.call("getValue", vec![json!(1)]).await.unwrap();
    assert_eq!(counter.count(), 2, "short hook ttl wins over the hour-long default");
}

#[tokio::test]
async fn config_default_ttl_applies() {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let config = ProxyConfig::new()
        .with_ttl(Duration::from_millis(40))
        .with_prefix("cfg:");
    let proxy = cache_proxy(ProxyOptions::from_config(store.clone(), &config))
        .wrap(calculator_target(&counter));

    proxy.call("getValue", vec![json!(9)]).await.unwrap();
    let write = store.last_write("cfg:getValue(9)").unwrap();
    assert_eq!(write.ttl, Some(Duration::from_millis(40)));

    tokio::time::sleep(Duration::from_millis(80)).await;
    proxy.call("getValue", vec![json!(9)]).await.unwrap();
    assert_eq!(counter.count(), 2);
}

#[tokio::test]
async fn nested_proxies_inherit_ttl() {
    let store = Arc::new(CountingStore::in_memory());
    let counter = CallCounter::new();
    let proxy = cache_proxy(ProxyOptions::new(store.clone()).with_ttl(Duration::from_millis(250)))
        .wrap(recall_test_utils::fixtures::nested_api_target(&counter));

    proxy.call_path("api.v2.getData", vec![]).await.unwrap();
    assert_eq!(
        store.last_write("api.v2.getData()").unwrap().ttl,
        Some(Duration::from_millis(250))
    );
}
