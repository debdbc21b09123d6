mod common;

use common::*;
use shellcache_store::{CacheMode, CacheStorage, CacheStore, Request, RequestKey, Response};
use shellcache_worker::{
    AddAllError, ControlMessage, EventOutcome, FetchOutcome, MessageOutcome, WorkerError,
    WorkerEvent, WorkerState,
};

const RESOURCES: &[(&str, &str)] = &[
    ("/", "h0"),
    ("main.js", "h1"),
    ("a.png", "h2"),
    ("b.png", "h3"),
];

#[tokio::test]
async fn test_download_offline_fetches_only_missing_resources() {
    let h = Harness::new();
    h.seed(COMMITTED, &[("main.js", "main")]).await;
    for (path, body) in [("/", "root"), ("a.png", "A"), ("b.png", "B")] {
        h.serve(path, body);
    }
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker
        .handle_message(ControlMessage::DownloadOffline)
        .await
        .unwrap();

    let MessageOutcome::Downloaded(report) = outcome else {
        panic!("download did not run");
    };
    assert_eq!(report.requested, 3);
    assert_eq!(report.downloaded, 3);
    assert_eq!(
        h.bodies(COMMITTED).await,
        expected(&[("/", "root"), ("a.png", "A"), ("b.png", "B"), ("main.js", "main")])
    );
    assert_eq!(h.fetcher.request_count(url("main.js").as_str()), 0);
    assert!(h
        .fetcher
        .recorded_requests()
        .iter()
        .all(|r| r.cache_mode == CacheMode::Reload));

    h.fetcher.clear_recorded();
    let MessageOutcome::Downloaded(again) = worker
        .handle_message(ControlMessage::DownloadOffline)
        .await
        .unwrap()
    else {
        panic!("second download did not run");
    };
    assert_eq!(again.requested, 0);
    assert!(h.fetcher.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_download_offline_ignores_versioned_copies() {
    let h = Harness::new();
    let committed = h.storage.open(COMMITTED).await.unwrap();
    let versioned = RequestKey::parse(&format!("{}/main.js?v=7", ORIGIN)).unwrap();
    committed
        .put(versioned, Response::new(200, "old main"))
        .await
        .unwrap();
    h.serve("/", "root");
    h.serve("main.js", "main");
    let worker = h.resumed(config(&[("/", "h0"), ("main.js", "h1")], &[]));

    let MessageOutcome::Downloaded(report) = worker
        .handle_message(ControlMessage::DownloadOffline)
        .await
        .unwrap()
    else {
        panic!("download did not run");
    };
    assert_eq!(report.requested, 2);
    assert_eq!(report.downloaded, 2);

    h.fetcher.set_offline(true);
    let outcome = worker
        .handle_fetch(&Request::get(url("main.js")))
        .await
        .unwrap();
    let FetchOutcome::Respond(response) = outcome else {
        panic!("main.js was not served from the cache");
    };
    assert_eq!(response.body.as_ref(), b"main");
}

#[tokio::test]
async fn test_download_offline_is_all_or_nothing() {
    let h = Harness::new();
    h.serve("/", "root");
    h.serve("main.js", "main");
    h.serve("a.png", "A");
    // b.png is not served and comes back 404.
    let worker = h.resumed(config(RESOURCES, &[]));

    let err = worker
        .handle_message(ControlMessage::DownloadOffline)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkerError::Download(AddAllError::BadStatus { status: 404, .. })
    ));
    assert!(h.bodies(COMMITTED).await.is_empty());
}

#[tokio::test]
async fn test_force_activate_while_installed_activates_now() {
    let h = Harness::new();
    h.serve("main.js", "main");
    let worker = h.worker(config(RESOURCES, &["main.js"]));
    worker.install().await.unwrap();

    let outcome = worker
        .handle_message(ControlMessage::parse("skipWaiting"))
        .await
        .unwrap();

    assert!(matches!(outcome, MessageOutcome::Activated(ref o) if o.is_committed()));
    assert_eq!(worker.state(), WorkerState::Activated);
    assert!(h.host.clients_claimed());
}

#[tokio::test]
async fn test_force_activate_in_other_states_only_signals() {
    let h = Harness::new();
    let worker = h.worker(config(RESOURCES, &[]));

    let outcome = worker
        .handle_message(ControlMessage::ForceActivate)
        .await
        .unwrap();

    assert!(matches!(outcome, MessageOutcome::SkipWaitingRequested));
    assert!(h.host.skip_waiting_requested());
    assert_eq!(worker.state(), WorkerState::Parsed);
}

#[tokio::test]
async fn test_unknown_message_is_ignored() {
    let h = Harness::new();
    let worker = h.resumed(config(RESOURCES, &[]));

    let outcome = worker
        .handle_message(ControlMessage::parse("reboot"))
        .await
        .unwrap();

    assert!(matches!(outcome, MessageOutcome::Ignored));
    assert!(h.fetcher.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_dispatch_drives_a_full_generation() {
    let h = Harness::new();
    h.serve("main.js", "main");
    h.serve("a.png", "A");
    let worker = h.worker(config(RESOURCES, &["main.js"]));

    let installed = worker.dispatch(WorkerEvent::Install).await.unwrap();
    assert!(matches!(installed, EventOutcome::Installed { staged: 1 }));

    let activated = worker.dispatch(WorkerEvent::Activate).await.unwrap();
    assert!(matches!(activated, EventOutcome::Activated(ref o) if o.is_committed()));

    let fetched = worker
        .dispatch(WorkerEvent::Fetch(Request::get(url("a.png"))))
        .await
        .unwrap();
    let EventOutcome::Fetch(FetchOutcome::Respond(response)) = fetched else {
        panic!("fetch was not intercepted");
    };
    assert_eq!(response.body.as_ref(), b"A");

    let message = worker
        .dispatch(WorkerEvent::Message(ControlMessage::parse("unknown")))
        .await
        .unwrap();
    assert!(matches!(
        message,
        EventOutcome::Message(MessageOutcome::Ignored)
    ));

    assert_eq!(
        h.bodies(COMMITTED).await,
        expected(&[("a.png", "A"), ("main.js", "main")])
    );
}
