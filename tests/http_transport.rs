//! Integration tests for the HTTP transport.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; no
//! socket is opened.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use s3_mcp::config::CorsConfig;
use s3_mcp::transport::http::{router, HttpState, SessionRegistry};

fn app() -> (Router, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new());
    let state = HttpState {
        server: common::server(),
        registry: Arc::clone(&registry),
    };
    (router(state, &CorsConfig::default()), registry)
}

fn post_mcp(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
}

fn initialize() -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0.0" }
        }
    })
    .to_string()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let (app, _) = app();
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn initialize_creates_session() {
    let (app, registry) = app();
    let body = initialize();
    let response = send(&app, post_mcp("/mcp").body(Body::from(body)).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(registry.get(&session_id).is_some());

    let body = body_json(response).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    assert!(body.get("result").is_some());
}

#[tokio::test]
async fn structurally_invalid_body_is_bad_request() {
    let (app, _) = app();
    let response = send(
        &app,
        post_mcp("/mcp")
            .body(Body::from(r#"{"hello":"world"}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn invalid_json_is_internal_error() {
    let (app, _) = app();
    let response = send(
        &app,
        post_mcp("/mcp").body(Body::from("{not json")).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Internal server error" })
    );
}

#[tokio::test]
async fn session_continues_via_query_parameter() {
    let (app, registry) = app();
    let body = initialize();
    let response = send(&app, post_mcp("/mcp").body(Body::from(body)).unwrap()).await;
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let call = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "list-buckets", "arguments": {} }
    })
    .to_string();
    let response = send(
        &app,
        post_mcp(&format!("/mcp?sessionId={session_id}"))
            .body(Body::from(call))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 2);
    let buckets: Value =
        serde_json::from_str(body["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(buckets.as_array().unwrap().len(), 2);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn session_continues_via_alternate_header() {
    let (app, _) = app();
    let body = initialize();
    let response = send(&app, post_mcp("/mcp").body(Body::from(body)).unwrap()).await;
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let list = json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }).to_string();
    let response = send(
        &app,
        post_mcp("/mcp")
            .header("x-mcp-session-id", &session_id)
            .body(Body::from(list))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["mcp-session-id"], session_id.as_str());
}

#[tokio::test]
async fn unknown_session_starts_uninitialised() {
    let (app, registry) = app();
    let list = json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }).to_string();
    let response = send(
        &app,
        post_mcp("/mcp")
            .header("mcp-session-id", "never-seen")
            .body(Body::from(list))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], -32000);
    assert!(registry.get("never-seen").is_some());
}

#[tokio::test]
async fn event_stream_accept_is_relaxed() {
    let (app, _) = app();
    let body = initialize();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn notifications_are_accepted() {
    let (app, _) = app();
    let body = initialize();
    let response = send(&app, post_mcp("/mcp").body(Body::from(body)).unwrap()).await;
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let notification =
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string();
    let response = send(
        &app,
        post_mcp("/mcp")
            .header("mcp-session-id", &session_id)
            .body(Body::from(notification))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn get_mcp_redirects_to_sse() {
    let (app, _) = app();
    let response = send(
        &app,
        Request::builder().uri("/mcp").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/sse");
}

#[tokio::test]
async fn preflight_answers_no_content_with_cors_headers() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mcp")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn sse_announces_endpoint() {
    let (app, registry) = app();
    let response = send(
        &app,
        Request::builder().uri("/sse").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.starts_with("event: endpoint\ndata: /mcp?sessionId="));
    assert!(text.ends_with("\n\n"));

    // Event-stream sessions live outside the request/response registry.
    assert!(registry.is_empty());
}
