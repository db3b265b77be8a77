use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use venue_ops::infrastructure::cache::{
    CacheConfig, CacheManager, InMemorySecondary, JsonCache, generate_cache_key, with_cache,
};

#[test]
fn cache_keys_ignore_param_order() {
    assert_eq!(
        generate_cache_key("p", [("b", 1), ("a", 2)]),
        generate_cache_key("p", [("a", 2), ("b", 1)])
    );
}

#[tokio::test]
async fn failed_producer_caches_nothing() {
    let cache = JsonCache::new(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    let result = with_cache(
        &cache,
        "search:q:spa",
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("database down")
        },
        None,
    )
    .await;

    assert_eq!(result.unwrap_err().to_string(), "database down");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!cache.has("search:q:spa").await);
}

#[tokio::test(start_paused = true)]
async fn cache_aside_respects_ttl() {
    let cache = JsonCache::new(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        with_cache(
            &cache,
            "featured",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(["venue-1"]))
            },
            Some(Duration::from_secs(1)),
        )
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(1100)).await;
    with_cache(
        &cache,
        "featured",
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(["venue-2"]))
        },
        None,
    )
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn two_managers_share_the_secondary_tier() {
    let secondary = Arc::new(InMemorySecondary::new());
    let writer: CacheManager<serde_json::Value> =
        CacheManager::with_secondary(CacheConfig::default(), secondary.clone());
    let reader: CacheManager<serde_json::Value> =
        CacheManager::with_secondary(CacheConfig::default(), secondary);

    writer.set("venue:1", json!({ "name": "Atelier" }), None).await;
    assert_eq!(reader.get("venue:1").await, Some(json!({ "name": "Atelier" })));
}
