//! Security tests for ftw-server admin routes
//!
//! Admin routes require a signed body (or signed query parameters when there
//! is no body) once a non-zero shared secret is configured.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ftw_common::api::sign_request;
use ftw_common::db::init_database;
use ftw_common::ledger::GovernanceLedger;
use ftw_common::payments::SafeSearch;
use ftw_common::time;
use ftw_server::services::StaticClassifier;
use ftw_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

const SECRET: i64 = 12345;

async fn setup_app_with_auth() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let db = init_database(&dir.path().join("ftw.db")).await.unwrap();
    let ledger = GovernanceLedger::in_memory();
    let classifier = Arc::new(StaticClassifier::returning(SafeSearch::default()));
    let state = AppState::new(db, ledger, classifier, SECRET);
    (dir, build_router(state))
}

fn signed(mut body: Value, secret: i64) -> Value {
    body["timestamp"] = json!(time::now_millis());
    let hash = sign_request(&body, secret);
    body["hash"] = json!(hash);
    body
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// =============================================================================
// Signed JSON bodies
// =============================================================================

#[tokio::test]
async fn test_missing_timestamp_is_bad_request() {
    let (_dir, app) = setup_app_with_auth().await;

    let (status, body) = post_json(
        &app,
        "/api/governance/inscribe",
        json!({"action": "a", "actor": "b", "hash": "00"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing timestamp field");
}

#[tokio::test]
async fn test_missing_hash_is_bad_request() {
    let (_dir, app) = setup_app_with_auth().await;

    let (status, body) = post_json(
        &app,
        "/api/governance/inscribe",
        json!({"action": "a", "actor": "b", "timestamp": time::now_millis()}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing hash field");
}

#[tokio::test]
async fn test_wrong_secret_is_unauthorized() {
    let (_dir, app) = setup_app_with_auth().await;

    let body = signed(json!({"action": "a", "actor": "b"}), SECRET + 1);
    let (status, body) = post_json(&app, "/api/governance/inscribe", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_tampered_body_is_unauthorized() {
    let (_dir, app) = setup_app_with_auth().await;

    let mut body = signed(json!({"action": "a", "actor": "b"}), SECRET);
    body["actor"] = json!("mallory");
    let (status, _) = post_json(&app, "/api/governance/inscribe", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stale_timestamp_is_unauthorized() {
    let (_dir, app) = setup_app_with_auth().await;

    let mut body = json!({"action": "a", "actor": "b", "timestamp": time::now_millis() - 60_000});
    let hash = sign_request(&body, SECRET);
    body["hash"] = json!(hash);

    let (status, body) = post_json(&app, "/api/governance/inscribe", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid timestamp"));
}

#[tokio::test]
async fn test_out_of_range_timestamp_is_unauthorized() {
    let (_dir, app) = setup_app_with_auth().await;

    for timestamp in [i64::MIN, i64::MAX] {
        let mut body = json!({"action": "a", "actor": "b", "timestamp": timestamp});
        let hash = sign_request(&body, SECRET);
        body["hash"] = json!(hash);

        let (status, body) = post_json(&app, "/api/governance/inscribe", body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "timestamp {}", timestamp);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_valid_signature_reaches_handler() {
    let (_dir, app) = setup_app_with_auth().await;

    let body = signed(
        json!({"action": "policy_update", "actor": "council", "justification": "signed"}),
        SECRET,
    );
    let (status, entry) = post_json(&app, "/api/governance/inscribe", body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["action"], "policy_update");
    assert_eq!(entry["version"], 1);

    let body = signed(json!({"command": "policy_change", "actor": "ops"}), SECRET);
    let (status, _) = post_json(&app, "/api/notary", body).await;
    assert_eq!(status, StatusCode::CREATED);
}

// =============================================================================
// Signed query parameters
// =============================================================================

#[tokio::test]
async fn test_delete_notary_with_signed_query() {
    let (_dir, app) = setup_app_with_auth().await;

    let timestamp = time::now_millis();
    let hash = sign_request(&json!({"timestamp": timestamp}), SECRET);
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/notary?timestamp={}&hash={}", timestamp, hash))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/notary")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Body size limit
// =============================================================================

#[tokio::test]
async fn test_oversized_admin_body_is_rejected() {
    let (_dir, app) = setup_app_with_auth().await;

    let large_body = vec![b'x'; ftw_server::api::auth::MAX_AUTH_BODY_BYTES + 1024];
    let request = Request::builder()
        .method("POST")
        .uri("/api/governance/inscribe")
        .header("Content-Type", "application/json")
        .body(Body::from(large_body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Public routes
// =============================================================================

#[tokio::test]
async fn test_public_routes_need_no_signature() {
    let (_dir, app) = setup_app_with_auth().await;

    for uri in ["/health", "/api/governance/ledger", "/api/notary", "/api/tiers"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
    }

    let (status, _) = post_json(
        &app,
        "/api/ban-proposals",
        json!({"user_id": "u1", "reason": "spam"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}
