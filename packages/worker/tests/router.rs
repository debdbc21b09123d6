mod common;

use common::*;
use shellcache_store::{Method, Request, Response, Url};
use shellcache_worker::{FetchOutcome, WorkerError};

const RESOURCES: &[(&str, &str)] = &[
    ("/", "h0"),
    ("index.html", "h0"),
    ("main.js", "h1"),
    ("lazy.js", "h2"),
];

fn get(path: &str) -> Request {
    Request::get(url(path))
}

fn get_url(raw: &str) -> Request {
    Request::get(Url::parse(raw).unwrap())
}

fn body(outcome: &FetchOutcome) -> String {
    let response = outcome.response().expect("request was not intercepted");
    String::from_utf8_lossy(&response.body).into_owned()
}

#[tokio::test]
async fn test_cache_hit_never_touches_network() {
    let h = Harness::new();
    h.seed(COMMITTED, &[("main.js", "cached")]).await;
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("main.js")).await.unwrap();

    assert_eq!(body(&outcome), "cached");
    assert!(h.fetcher.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_cache_miss_fills_lazily() {
    let h = Harness::new();
    h.serve("lazy.js", "lazy");
    let worker = h.resumed(config(RESOURCES, &[]));

    let first = worker.handle_fetch(&get("lazy.js")).await.unwrap();
    let second = worker.handle_fetch(&get("lazy.js")).await.unwrap();

    assert_eq!(body(&first), "lazy");
    assert_eq!(body(&second), "lazy");
    assert_eq!(h.fetcher.request_count(url("lazy.js").as_str()), 1);
    assert_eq!(h.bodies(COMMITTED).await, expected(&[("lazy.js", "lazy")]));
}

#[tokio::test]
async fn test_error_status_is_returned_but_not_cached() {
    let h = Harness::new();
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("lazy.js")).await.unwrap();

    assert_eq!(outcome.response().map(|r| r.status), Some(404));
    assert!(h.bodies(COMMITTED).await.is_empty());
}

#[tokio::test]
async fn test_cache_first_network_failure_propagates() {
    let h = Harness::new();
    h.fetcher.set_offline(true);
    let worker = h.resumed(config(RESOURCES, &[]));

    let err = worker.handle_fetch(&get("lazy.js")).await.unwrap_err();

    assert!(matches!(err, WorkerError::Fetch(_)));
    assert!(h.bodies(COMMITTED).await.is_empty());
}

#[tokio::test]
async fn test_uncacheable_response_is_still_served() {
    let h = Harness::new();
    h.fetcher
        .set_response(url("lazy.js").as_str(), Response::new(206, "partial"));
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("lazy.js")).await.unwrap();

    assert_eq!(body(&outcome), "partial");
    assert!(h.bodies(COMMITTED).await.is_empty());
}

#[tokio::test]
async fn test_root_is_online_first_and_refreshes_cache() {
    let h = Harness::new();
    h.seed(COMMITTED, &[("/", "stale")]).await;
    h.serve("/", "fresh");
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("/")).await.unwrap();

    assert_eq!(body(&outcome), "fresh");
    assert_eq!(h.fetcher.recorded_requests().len(), 1);
    assert_eq!(h.bodies(COMMITTED).await, expected(&[("/", "fresh")]));
}

#[tokio::test]
async fn test_root_falls_back_to_cache_when_offline() {
    let h = Harness::new();
    h.seed(COMMITTED, &[("/", "cached-root")]).await;
    h.fetcher.set_offline(true);
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("/")).await.unwrap();

    assert_eq!(body(&outcome), "cached-root");
}

#[tokio::test]
async fn test_root_without_cache_surfaces_network_error() {
    let h = Harness::new();
    h.fetcher.set_offline(true);
    let worker = h.resumed(config(RESOURCES, &[]));

    let err = worker.handle_fetch(&get("/")).await.unwrap_err();

    match err {
        WorkerError::Fetch(fetch_err) => {
            assert!(fetch_err.is_network());
            assert!(fetch_err.to_string().contains(ORIGIN));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_online_first_caches_error_statuses() {
    let h = Harness::new();
    h.fetcher
        .set_response(url("/").as_str(), Response::new(500, "oops"));
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("/")).await.unwrap();

    assert_eq!(outcome.response().map(|r| r.status), Some(500));
    assert_eq!(h.bodies(COMMITTED).await, expected(&[("/", "oops")]));
}

#[tokio::test]
async fn test_navigation_and_versioned_root_are_online_first() {
    let h = Harness::new();
    h.serve("/", "root");
    let worker = h.resumed(config(RESOURCES, &[]));

    for raw in [
        "https://app.example",
        "https://app.example/#/settings",
        "https://app.example/?v=3",
    ] {
        let outcome = worker.handle_fetch(&get_url(raw)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Respond(_)), "{raw}");
    }
}

#[tokio::test]
async fn test_versioned_resource_is_cached_under_its_own_identity() {
    let h = Harness::new();
    h.fetcher.set_response(
        "https://app.example/main.js?v=9",
        Response::new(200, "main"),
    );
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker
        .handle_fetch(&get_url("https://app.example/main.js?v=9"))
        .await
        .unwrap();

    assert_eq!(body(&outcome), "main");
    let cached = h.storage.open_in_memory(COMMITTED).unwrap().snapshot().unwrap();
    let keys: Vec<&str> = cached.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["https://app.example/main.js?v=9"]);
}

#[tokio::test]
async fn test_requests_outside_manifest_pass_through() {
    let h = Harness::new();
    let worker = h.resumed(config(RESOURCES, &[]));

    for request in [
        get("api/users"),
        get_url("https://app.example/main.js?debug=1"),
        get_url("https://cdn.example/main.js"),
        Request::new(Method::POST, url("main.js")),
        Request::new(Method::HEAD, url("/")),
    ] {
        let outcome = worker.handle_fetch(&request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough, "{}", request.url);
    }
    assert!(h.fetcher.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_nothing_is_intercepted_before_activation() {
    let h = Harness::new();
    h.seed(COMMITTED, &[("main.js", "cached")]).await;
    let worker = h.worker(config(RESOURCES, &[]));

    let outcome = worker.handle_fetch(&get("main.js")).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Passthrough);
}
