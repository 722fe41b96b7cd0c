//! API Integration Tests
//!
//! Drive the full router against the in-memory store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use merchio_api::auth::{issue_token, verify_token, JwtConfig};
use merchio_api::{create_router_for_testing, create_router_with_store, TEST_JWT_SECRET};
use merchio_core::{MerchError, User, UserRepository};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn me_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/api/me");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// POST /api/auth and return the status and raw body
async fn authenticate(app: &Router, username: &str, password: &str) -> (StatusCode, String) {
    let request = create_json_request(
        "POST",
        "/api/auth",
        Some(json!({ "username": username, "password": password })),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_text(response).await)
}

async fn token_for(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = authenticate(app, username, password).await;
    assert_eq!(status, StatusCode::OK, "auth failed: {body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

fn user_id_of(token: &str) -> i64 {
    verify_token(&JwtConfig::new(TEST_JWT_SECRET), token, Utc::now())
        .unwrap()
        .user_id
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/auth"].is_object());
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_auth_registers_and_returns_token() {
    let app = create_router_for_testing();

    let token = token_for(&app, "alice", "secret1").await;

    assert_eq!(token.split('.').count(), 3);
    assert_eq!(user_id_of(&token), 1);
}

#[tokio::test]
async fn test_auth_scenario() {
    let app = create_router_for_testing();

    let first = token_for(&app, "alice", "secret1").await;
    let second = token_for(&app, "alice", "secret1").await;
    assert_eq!(user_id_of(&first), 1);
    assert_eq!(user_id_of(&second), 1);

    let (status, body) = authenticate(&app, "alice", "wrongpw").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "неверный пароль");
}

#[tokio::test]
async fn test_auth_distinct_users() {
    let app = create_router_for_testing();

    let alice = token_for(&app, "alice", "secret1").await;
    let bob = token_for(&app, "bob", "hunter2").await;

    assert_eq!(user_id_of(&alice), 1);
    assert_eq!(user_id_of(&bob), 2);
}

#[tokio::test]
async fn test_auth_empty_fields() {
    let app = create_router_for_testing();

    let (status, body) = authenticate(&app, "", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "некорректный запрос");

    let (status, _) = authenticate(&app, "alice", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_malformed_body() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "некорректный запрос");

    let request = create_json_request("POST", "/api/auth", Some(json!({ "username": "alice" })));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_store_failure_hides_details() {
    let app = create_router_with_store(Arc::new(UnavailableStore));

    let (status, body) = authenticate(&app, "alice", "secret1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ошибка существования пользователя");
    assert!(!body.contains("connection refused"));
}

// =============================================================================
// Session Guard Tests
// =============================================================================

#[tokio::test]
async fn test_me_without_header() {
    let app = create_router_for_testing();

    let response = app.oneshot(me_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "отсутствует токен");
}

#[tokio::test]
async fn test_me_with_garbage_token() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(me_request(Some("Bearer garbage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "недействительный токен");
}

#[tokio::test]
async fn test_me_with_valid_token() {
    let app = create_router_for_testing();
    let token = token_for(&app, "alice", "secret1").await;

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], 1);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["coins"], 1000);
    assert!(json["created_at"].is_string());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn test_me_accepts_bare_token() {
    let app = create_router_for_testing();
    let token = token_for(&app, "alice", "secret1").await;

    let response = app.oneshot(me_request(Some(&token))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_rejects_foreign_secret() {
    let app = create_router_for_testing();
    token_for(&app, "alice", "secret1").await;
    let foreign = issue_token(&JwtConfig::new("someone-else"), 1, Utc::now()).unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {foreign}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "недействительный токен");
}

#[tokio::test]
async fn test_me_rejects_unsigned_token() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let app = create_router_for_testing();
    token_for(&app, "alice", "secret1").await;

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(r#"{"user_id":1,"iat":0,"exp":9999999999}"#);
    let unsigned = format!("{header}.{payload}.");

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {unsigned}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_accepts_expired_token_by_default() {
    let app = create_router_for_testing();
    token_for(&app, "alice", "secret1").await;
    let stale = issue_token(
        &JwtConfig::new(TEST_JWT_SECRET),
        1,
        Utc::now() - Duration::hours(48),
    )
    .unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {stale}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_for_unknown_subject() {
    let app = create_router_for_testing();
    let token = issue_token(&JwtConfig::new(TEST_JWT_SECRET), 42, Utc::now()).unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "пользователь не найден");
}

#[tokio::test]
async fn test_me_accepts_token_without_iat() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let app = create_router_for_testing();
    token_for(&app, "alice", "secret1").await;
    let token = encode(
        &Header::default(),
        &json!({ "user_id": 1, "exp": Utc::now().timestamp() + 86_400 }),
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], 1);
}

// =============================================================================
// Test doubles
// =============================================================================

/// Store that fails every call, like an unreachable database
struct UnavailableStore;

fn unavailable() -> MerchError {
    MerchError::DatabaseError("connection refused".to_string())
}

#[async_trait]
impl UserRepository for UnavailableStore {
    async fn exists(&self, _username: &str) -> merchio_core::Result<bool> {
        Err(unavailable())
    }

    async fn create(&self, _username: &str, _password_hash: &str) -> merchio_core::Result<i64> {
        Err(unavailable())
    }

    async fn find_by_username(&self, _username: &str) -> merchio_core::Result<User> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: i64) -> merchio_core::Result<User> {
        Err(unavailable())
    }
}
