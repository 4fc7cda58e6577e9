use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use indexmap::IndexMap;
use parking_lot::RwLock;
use sha1::{Digest, Sha1};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

/// Prefix the UI uses for every backend call.
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Backend base, e.g. `http://localhost:9090/api/v1/`.
    pub upstream: Url,
    pub static_dir: Option<PathBuf>,
    pub cache: bool,
    /// Entries kept before the oldest is evicted.
    pub cache_capacity: usize,
    pub timeout: Option<Duration>,
}

/// Default number of cached responses.
pub const CACHE_CAPACITY: usize = 1024;

#[derive(Clone)]
struct CachedResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Bytes,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(ct) = self.content_type {
            headers.insert(header::CONTENT_TYPE, ct);
        }
        (self.status, headers, self.body).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    client: reqwest::Client,
    upstream: Url,
    cache: Option<Arc<RwLock<ResponseCache>>>,
}

// Insertion-ordered so the oldest entry goes first once `capacity` is reached.
struct ResponseCache {
    entries: IndexMap<String, CachedResponse>,
    capacity: usize,
}

impl ResponseCache {
    fn new(capacity: usize) -> Self { Self { entries: IndexMap::new(), capacity: capacity.max(1) } }

    fn get(&self, key: &str) -> Option<CachedResponse> { self.entries.get(key).cloned() }

    fn insert(&mut self, key: String, resp: CachedResponse) {
        while self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(key, resp);
    }
}

fn cors_layer() -> CorsLayer {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

pub fn build_app(config: ProxyConfig) -> Result<Router> {
    let mut upstream = config.upstream;
    if !upstream.path().ends_with('/') {
        let path = format!("{}/", upstream.path());
        upstream.set_path(&path);
    }
    let mut client = reqwest::Client::builder();
    if let Some(t) = config.timeout {
        client = client.timeout(t);
    }
    let state = AppState {
        client: client.build()?,
        upstream,
        cache: config.cache.then(|| Arc::new(RwLock::new(ResponseCache::new(config.cache_capacity)))),
    };

    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            &format!("{API_PREFIX}/*path"),
            get(forward).post(forward).options(|| async { StatusCode::OK }),
        )
        .with_state(state);
    if let Some(dir) = config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    Ok(app.layer(cors_layer()).layer(TraceLayer::new_for_http()))
}

/// Hex SHA-1 over method, target and body; identical calls share a cache entry.
pub fn cache_key(method: &Method, target: &str, body: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(target.as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

fn bad_gateway(msg: String) -> Response {
    (StatusCode::BAD_GATEWAY, Json(serde_json::json!({ "error": msg }))).into_response()
}

async fn forward(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
        tracing::warn!(%path, "rejected path escaping the api prefix");
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid path" }))).into_response();
    }
    let mut target = match state.upstream.join(&path) {
        Ok(u) => u,
        Err(e) => return bad_gateway(format!("invalid upstream path {path:?}: {e}")),
    };
    target.set_query(query.as_deref());

    let key = cache_key(&method, target.as_str(), &body);
    if let Some(hit) = state.cache.as_ref().and_then(|c| c.read().get(&key)) {
        tracing::debug!(%target, "cache hit");
        return hit.into_response();
    }

    let mut req = state.client.request(method.clone(), target.clone());
    if let Some(ct) = headers.get(header::CONTENT_TYPE) {
        req = req.header(header::CONTENT_TYPE, ct.clone());
    }
    if !body.is_empty() {
        req = req.body(body.clone());
    }
    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%target, error = %e, "upstream request failed");
            return bad_gateway(e.to_string());
        }
    };
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => return bad_gateway(e.to_string()),
    };
    let out = CachedResponse { status, content_type, body: bytes };
    if let Some(cache) = &state.cache {
        if status.is_success() {
            cache.write().insert(key, out.clone());
        }
    }
    tracing::info!(%method, %target, status = status.as_u16(), "proxied");
    out.into_response()
}
