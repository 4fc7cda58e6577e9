use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use dumpview_server::{build_app, ProxyConfig, CACHE_CAPACITY};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

// Fake backend counting how often it is actually reached.
async fn spawn_upstream() -> (Url, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/v1/dump/peek",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "count": 42 }))
            }),
        )
        .route(
            "/api/v1/dump/fetch",
            post(|State(hits): State<Arc<AtomicUsize>>, Json(body): Json<Value>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "echo": body }))
            }),
        )
        .with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}/api/v1/")).unwrap(), hits)
}

fn config(upstream: Url) -> ProxyConfig { ProxyConfig { upstream, static_dir: None, cache: true, cache_capacity: CACHE_CAPACITY, timeout: None } }

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn get_req(uri: &str) -> Request<Body> { Request::get(uri).body(Body::empty()).unwrap() }

#[tokio::test]
async fn health_is_ok() {
    let (upstream, _) = spawn_upstream().await;
    let app = build_app(config(upstream)).unwrap();
    let (status, body) = call(app, get_req("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    let (upstream, hits) = spawn_upstream().await;
    let app = build_app(config(upstream)).unwrap();

    let (status, body) = call(app.clone(), get_req("/api/v1/dump/peek?term=liver")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 42);

    let (_, again) = call(app.clone(), get_req("/api/v1/dump/peek?term=liver")).await;
    assert_eq!(body, again);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    call(app, get_req("/api/v1/dump/peek?term=brain")).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn full_cache_drops_the_oldest_entry() {
    let (upstream, hits) = spawn_upstream().await;
    let app = build_app(ProxyConfig { cache_capacity: 1, ..config(upstream) }).unwrap();
    call(app.clone(), get_req("/api/v1/dump/peek?term=liver")).await;
    call(app.clone(), get_req("/api/v1/dump/peek?term=brain")).await;
    call(app.clone(), get_req("/api/v1/dump/peek?term=brain")).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    call(app, get_req("/api/v1/dump/peek?term=liver")).await;
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn parent_segments_cannot_leave_the_api_prefix() {
    let (upstream, hits) = spawn_upstream().await;
    let app = build_app(config(upstream)).unwrap();
    for uri in ["/api/v1/../../health", "/api/v1/dump/%2e%2e/%2e%2e/x"] {
        let (status, _) = call(app.clone(), get_req(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn post_bodies_are_forwarded_and_keyed() {
    let (upstream, hits) = spawn_upstream().await;
    let app = build_app(ProxyConfig { cache: false, ..config(upstream) }).unwrap();
    let post = |terms: Value| {
        Request::post("/api/v1/dump/fetch")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "terms": terms, "max_results": 10 }).to_string()))
            .unwrap()
    };

    let (status, body) = call(app.clone(), post(json!(["a"]))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["echo"]["terms"], json!(["a"]));

    call(app, post(json!(["a"]))).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let app = build_app(config(Url::parse(&format!("http://{addr}/api/v1/")).unwrap())).unwrap();

    let (status, body) = call(app, get_req("/api/v1/dump/peek?term=x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn serves_static_ui() {
    let (upstream, _) = spawn_upstream().await;
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>dumpview</html>").unwrap();
    let app = build_app(ProxyConfig { static_dir: Some(dir.path().to_path_buf()), ..config(upstream) }).unwrap();

    let (status, body) = call(app, get_req("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"<html>dumpview</html>");
}
