use super::helpers::{expect_status, get, read_json, send, spawn_app};
use http::StatusCode;
use serde_json::{Value, json};
use venue_ops::infrastructure::cache::{generate_cache_key, with_cache};

#[tokio::test]
async fn cache_stats_reflect_cache_aside_usage() {
    let app = spawn_app();
    let cache = app.state.cache.as_ref();

    let key = generate_cache_key("venues", [("city", "lyon"), ("page", "1")]);
    let first = with_cache(cache, &key, || async { Ok(json!({ "venues": [1, 2, 3] })) }, None)
        .await
        .unwrap();
    let second = with_cache(
        cache,
        &key,
        || async { anyhow::bail!("producer must not run on a hit") },
        None,
    )
    .await
    .unwrap();
    assert_eq!(first, second);

    let res = expect_status(send(&app.app, get("/api/v1/ops/cache")).await, StatusCode::OK).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["size"], 1);
    assert_eq!(body["maxSize"], 1000);
    assert_eq!(body["expiredItems"], 0);
}
