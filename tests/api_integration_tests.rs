//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration as TtlDuration;
use quickshare::{
    api::create_router,
    blob::FsBlobStore,
    clock::ManualClock,
    share::{IdAllocator, ScriptedCandidates, ShareService},
    AppState, PersistenceConfig, PersistenceManager,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

struct TestApp {
    _dir: TempDir,
    clock: ManualClock,
    router: Router,
}

async fn create_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::starting_now();
    let config = PersistenceConfig {
        metadata_file: dir.path().join("data/shares_metadata.json"),
        max_entries: 100,
        ttl: TtlDuration::hours(24),
        flush_interval: Duration::from_secs(3600),
        shutdown_timeout: Duration::from_secs(1),
    };
    let manager = PersistenceManager::open(config, Arc::new(clock.clone()))
        .await
        .unwrap();
    let allocator = IdAllocator::with_source(
        manager.clone(),
        5,
        ScriptedCandidates::new(["0007", "0008", "0009", "0010"]),
    );
    let blobs = Arc::new(FsBlobStore::new(dir.path().join("files")));
    let service = Arc::new(ShareService::new(manager, allocator, blobs));

    TestApp {
        router: create_router(AppState::new(service)),
        clock,
        _dir: dir,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_text(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/share/text")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "textContent": text, "richText": false }).to_string(),
        ))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "quickshare-test-boundary";

fn post_file(file_name: &str, content_type: &str, data: &str, rich_text: bool) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n{data}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"richText\"\r\n\r\n{rich_text}\r\n\
         --{b}--\r\n",
        b = BOUNDARY
    );
    Request::builder()
        .method("POST")
        .uri("/api/share/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

// == Text Share Tests ==

#[tokio::test]
async fn test_create_text_share() {
    let app = create_test_app().await;

    let response = app.router.oneshot(post_text("hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["shareId"], "0007");
    assert_eq!(json["share"]["textContent"], "hello");
    assert_eq!(json["share"]["isFile"], false);
    assert_eq!(json["share"]["viewCount"], 0);
}

#[tokio::test]
async fn test_create_empty_text_is_bad_request() {
    let app = create_test_app().await;

    let response = app.router.oneshot(post_text("")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_fetch_counts_views_then_expires() {
    let app = create_test_app().await;

    app.router.clone().oneshot(post_text("hello")).await.unwrap();

    let response = app.router.clone().oneshot(get("/api/share/0007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["viewCount"], 1);

    let response = app.router.clone().oneshot(get("/api/share/0007")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["viewCount"], 2);

    app.clock.advance(TtlDuration::hours(25));

    let response = app.router.oneshot(get("/api/share/0007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetch_unknown_share() {
    let app = create_test_app().await;

    let response = app.router.oneshot(get("/api/share/4242")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("4242"));
}

// == File Share Tests ==

#[tokio::test]
async fn test_upload_and_download_file() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_file("notes.txt", "text/plain", "file body", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["share"]["isFile"], true);
    assert_eq!(json["share"]["fileName"], "notes.txt");
    assert_eq!(json["share"]["size"], 9);
    assert_eq!(json["share"]["richText"], true);
    assert!(json["share"].get("location").is_none());

    let response = app
        .router
        .oneshot(get("/api/share/0007/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"file body");
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = create_test_app().await;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"richText\"\r\n\r\ntrue\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/share/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_with_truncated_rich_text_field() {
    let app = create_test_app().await;

    // Body ends inside the richText field, with no closing boundary.
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
         Content-Type: text/plain\r\n\r\nabc\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"richText\"\r\n\r\ntr",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/share/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Malformed upload"));

    // Nothing was created.
    let response = app.router.oneshot(get("/api/share/0007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_text_share_is_bad_request() {
    let app = create_test_app().await;
    app.router.clone().oneshot(post_text("plain")).await.unwrap();

    let response = app
        .router
        .oneshot(get("/api/share/0007/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Stats / Health Tests ==

#[tokio::test]
async fn test_stats_reflect_activity() {
    let app = create_test_app().await;
    app.router.clone().oneshot(post_text("one")).await.unwrap();
    app.router.clone().oneshot(post_text("two")).await.unwrap();

    let response = app.router.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["liveShares"], 2);
    assert_eq!(json["pendingFlush"], true);
    assert_eq!(json["flushes"], 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}

// == Live Server Test ==

#[tokio::test]
async fn test_live_server_round_trip() {
    let app = create_test_app().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app.router).await.unwrap();
    });

    let client = reqwest::Client::new();
    let created: Value = client
        .post(format!("http://{}/api/share/text", addr))
        .json(&serde_json::json!({ "textContent": "over the wire" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["shareId"].as_str().unwrap().to_string();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"payload".to_vec())
            .file_name("p.bin")
            .mime_str("application/octet-stream")
            .unwrap(),
    );
    let uploaded = client
        .post(format!("http://{}/api/share/file", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(uploaded.status(), reqwest::StatusCode::OK);

    let fetched: Value = client
        .get(format!("http://{}/api/share/{}", addr, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["textContent"], "over the wire");
    assert_eq!(fetched["viewCount"], 1);

    server.abort();
}
