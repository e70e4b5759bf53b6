//! Sign-in, registration, refresh and the 401 handler against the mock
//! backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use bazaar_core::{MemberId, SellerId};
use bazaar_integration_tests::MockBackend;
use bazaar_storefront::api::{ApiError, GENERIC_FAILURE};
use bazaar_storefront::models::RegisterRequest;
use bazaar_storefront::models::session::STORE_KEY;
use bazaar_storefront::services::Credentials;
use bazaar_storefront::store::persist::{FileStorage, KeyValueStorage, MemoryStorage};
use bazaar_storefront::AppContext;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

fn alice_login(backend: &MockBackend) {
    backend.respond(
        Method::POST,
        "/api/login",
        StatusCode::OK,
        json!({
            "user": {"id": 7, "username": "alice", "sellerID": null, "hasShop": false},
            "token": "tok123"
        }),
    );
}

async fn signed_in(backend: &MockBackend, storage: Arc<dyn KeyValueStorage>) -> AppContext {
    alice_login(backend);
    let ctx = backend.context_with(storage);
    ctx.account()
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap();
    ctx
}

fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: SecretString::from("pw"),
        first_name: "Bob".to_string(),
        last_name: "Builder".to_string(),
        email: None,
        age: None,
        phone: None,
        birthday: None,
        address: None,
        gender_id: None,
    }
}

#[tokio::test]
async fn test_login_commits_session() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let ctx = signed_in(&backend, storage.clone()).await;

    let snapshot = ctx.store().snapshot();
    let user = snapshot.session.user.as_ref().unwrap();
    assert_eq!(user.id, MemberId::new(7));
    assert_eq!(snapshot.session.token_str(), Some("tok123"));
    assert!(!snapshot.session.has_shop());

    let sent = backend.requests_to(&Method::POST, "/api/login");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].json(), json!({"username": "alice", "password": "pw"}));

    let header = ctx.store().auth_header();
    assert_eq!(header.get("authorization").unwrap(), "Bearer tok123");

    let persisted: Value = serde_json::from_str(&storage.get(STORE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(persisted["version"], 0);
    assert_eq!(persisted["state"]["token"], "tok123");
    assert_eq!(persisted["state"]["hasShop"], false);
    assert_eq!(persisted["state"]["user"]["id"], 7);
}

#[tokio::test]
async fn test_login_without_token_is_invalid_response() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        "/api/login",
        StatusCode::OK,
        json!({"user": {"id": 7, "username": "alice"}}),
    );
    let ctx = backend.context();

    let err = ctx
        .account()
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert!(ctx.store().snapshot().session.user.is_none());
    assert!(ctx.store().auth_header().is_empty());
}

#[tokio::test]
async fn test_failed_login_clears_previous_session() {
    let backend = MockBackend::start().await;
    let ctx = signed_in(&backend, Arc::new(MemoryStorage::new())).await;

    backend.respond(
        Method::POST,
        "/api/login",
        StatusCode::BAD_REQUEST,
        json!({"message": "password invalid"}),
    );
    let err = ctx
        .account()
        .login(&Credentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message(), "password invalid");
    assert!(err.is_network_or_server());
    assert!(ctx.store().token().is_none());
}

#[tokio::test]
async fn test_unauthorized_response_clears_everything() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let ctx = signed_in(&backend, storage.clone()).await;
    assert!(storage.get(STORE_KEY).unwrap().is_some());

    backend.respond(
        Method::GET,
        "/api/ListMyPostProducts",
        StatusCode::UNAUTHORIZED,
        json!({"message": "token expired"}),
    );
    let err = ctx.catalog().my_listings().await.unwrap_err();

    assert!(err.is_unauthorized());
    let sent = backend.requests_to(&Method::GET, "/api/ListMyPostProducts");
    assert_eq!(sent[0].authorization().as_deref(), Some("Bearer tok123"));

    assert!(ctx.store().auth_header().is_empty());
    let snapshot = ctx.store().snapshot();
    assert!(snapshot.session.user.is_none());
    assert!(snapshot.session.token.is_none());
    let persisted: Value = serde_json::from_str(&storage.get(STORE_KEY).unwrap().unwrap()).unwrap();
    assert!(persisted["state"]["user"].is_null());
    assert!(persisted["state"]["token"].is_null());
}

#[tokio::test]
async fn test_register_without_token_does_not_sign_in() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        "/api/register",
        StatusCode::CREATED,
        json!({"message": "Register success", "user": {"id": 8, "username": "bob"}}),
    );
    let ctx = backend.context();

    let outcome = ctx.account().register(&register_request("bob")).await.unwrap();
    assert_eq!(outcome.user.id, MemberId::new(8));
    assert!(!outcome.signed_in());
    assert!(ctx.store().snapshot().session.user.is_none());

    let body = backend.requests_to(&Method::POST, "/api/register")[0].json();
    assert_eq!(body["firstName"], "Bob");
    assert_eq!(body["lastName"], "Builder");
    assert!(body.get("email").is_none());
}

#[tokio::test]
async fn test_register_with_token_signs_in() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        "/api/register",
        StatusCode::CREATED,
        json!({
            "message": "Register success",
            "user": {"id": 9, "username": "carol", "people": {"id": 3, "firstName": "Carol"}},
            "token": "a.b.c"
        }),
    );
    let ctx = backend.context();

    let outcome = ctx.account().register(&register_request("carol")).await.unwrap();
    assert!(outcome.signed_in());
    assert_eq!(outcome.token.unwrap().expose_secret(), "a.b.c");
    assert_eq!(ctx.store().snapshot().session.member_id(), Some(MemberId::new(9)));
}

#[tokio::test]
async fn test_register_without_user_is_invalid_response() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        "/api/register",
        StatusCode::CREATED,
        json!({"message": "Register success"}),
    );
    let ctx = backend.context();

    let err = ctx.account().register(&register_request("dan")).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_refresh_user_without_token_makes_no_request() {
    let backend = MockBackend::start().await;
    let ctx = backend.context();

    assert!(ctx.account().refresh_user().await.unwrap().is_none());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_refresh_user_updates_shop_flag() {
    let backend = MockBackend::start().await;
    let ctx = signed_in(&backend, Arc::new(MemoryStorage::new())).await;

    backend.respond(
        Method::GET,
        "/api/current-user",
        StatusCode::OK,
        json!({
            "user": {"id": 7, "username": "alice", "sellerID": 3, "hasShop": true},
            "has_shop": true
        }),
    );
    let user = ctx.account().refresh_user().await.unwrap().unwrap();

    assert_eq!(user.seller_id, Some(SellerId::new(3)));
    let snapshot = ctx.store().snapshot();
    assert!(snapshot.session.has_shop());
    assert_eq!(snapshot.session.token_str(), Some("tok123"));
    let sent = backend.requests_to(&Method::GET, "/api/current-user");
    assert_eq!(sent[0].authorization().as_deref(), Some("Bearer tok123"));
}

#[tokio::test]
async fn test_refresh_user_server_error_keeps_state() {
    let backend = MockBackend::start().await;
    let ctx = signed_in(&backend, Arc::new(MemoryStorage::new())).await;

    backend.respond(
        Method::GET,
        "/api/current-user",
        StatusCode::NOT_FOUND,
        json!({"message": "user not found"}),
    );
    let err = ctx.account().refresh_user().await.unwrap_err();

    assert!(err.is_network_or_server());
    assert_eq!(ctx.store().snapshot().session.member_id(), Some(MemberId::new(7)));
    assert!(ctx.store().token().is_some());
}

#[tokio::test]
async fn test_refresh_user_without_user_changes_nothing() {
    let backend = MockBackend::start().await;
    let ctx = signed_in(&backend, Arc::new(MemoryStorage::new())).await;

    backend.respond(Method::GET, "/api/current-user", StatusCode::OK, json!({"has_shop": true}));
    assert!(ctx.account().refresh_user().await.unwrap().is_none());
    assert!(!ctx.store().snapshot().session.has_shop());
}

#[tokio::test]
async fn test_session_survives_restart_on_disk() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let ctx = signed_in(&backend, Arc::new(FileStorage::new(&path))).await;
    drop(ctx);

    let reopened = backend.context_with(Arc::new(FileStorage::new(&path)));
    let snapshot = reopened.store().snapshot();
    assert_eq!(snapshot.session.member_id(), Some(MemberId::new(7)));
    assert_eq!(snapshot.session.token_str(), Some("tok123"));

    reopened.account().logout(true);
    let wiped = backend.context_with(Arc::new(FileStorage::new(&path)));
    assert!(wiped.store().snapshot().session.user.is_none());
}

#[tokio::test]
async fn test_legacy_keys_are_rehydrated() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStorage::with_entries([
        ("currentUser", r#"{"ID": 5, "UserName": "erin", "sellerID": 2}"#),
        ("token", r#""legacy-token""#),
    ]));
    let ctx = backend.context_with(storage);

    let snapshot = ctx.store().snapshot();
    assert_eq!(snapshot.session.member_id(), Some(MemberId::new(5)));
    assert_eq!(snapshot.session.token_str(), Some("legacy-token"));
    assert!(snapshot.session.has_shop());

    let _ = ctx.catalog().my_listings().await;
    let sent = backend.requests_to(&Method::GET, "/api/ListMyPostProducts");
    assert_eq!(sent[0].authorization().as_deref(), Some("Bearer legacy-token"));
}

#[tokio::test]
async fn test_unauthorized_without_message_uses_generic_text() {
    let backend = MockBackend::start().await;
    let ctx = signed_in(&backend, Arc::new(MemoryStorage::new())).await;
    backend.respond(
        Method::GET,
        "/api/current-user",
        StatusCode::UNAUTHORIZED,
        json!({}),
    );

    let err = ctx.account().refresh_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), GENERIC_FAILURE);
    assert!(ctx.store().token().is_none());
}
