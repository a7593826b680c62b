use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use tower::ServiceExt;

use qr_upload::config::CorsConfig;
use qr_upload::cors::build_cors_layer;
use qr_upload::features::storage::MemoryBlobStore;
use qr_upload::{AppState, build_app};

fn full_app() -> Router {
    build_app(
        AppState::new(Arc::new(MemoryBlobStore::new()), "acct", "qr"),
        &CorsConfig::default(),
    )
}

#[tokio::test]
async fn localhost_3000_receives_allow_origin() {
    let req = Request::builder()
        .method("POST")
        .uri("/generate-qr/?url=https://example.com")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("build request");
    let resp = full_app().oneshot(req).await.expect("call app");
    assert_eq!(resp.status(), StatusCode::OK);

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("missing allow origin")
        .to_str()
        .expect("invalid allow origin");
    assert_eq!(allow_origin, "http://localhost:3000");
}

#[tokio::test]
async fn other_origin_gets_no_cors_headers() {
    let req = Request::builder()
        .method("POST")
        .uri("/generate-qr/?url=https://example.com")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .expect("build request");
    let resp = full_app().oneshot(req).await.expect("call app");

    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn preflight_allows_any_method_and_header() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/generate-qr/")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom-header")
        .body(Body::empty())
        .expect("build request");
    let resp = full_app().oneshot(req).await.expect("call app");

    let header_str = |name: header::HeaderName| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    assert_eq!(
        header_str(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:3000"
    );
    assert_eq!(header_str(header::ACCESS_CONTROL_ALLOW_METHODS), "*");
    assert_eq!(header_str(header::ACCESS_CONTROL_ALLOW_HEADERS), "*");
}

#[tokio::test]
async fn configured_origin_list_replaces_default() {
    let cors = CorsConfig {
        allowed_origins: vec!["https://app.example.com".to_string()],
        allowed_methods: vec!["POST".to_string()],
        ..CorsConfig::default()
    };
    let layer = build_cors_layer(&cors).expect("cors layer");
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(layer);

    let req = Request::builder()
        .method("GET")
        .uri("/")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");
    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
