mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sha2::{Digest, Sha256};

use common::{PASSWORD, spawn_app};

fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[tokio::test]
async fn register_then_login() {
    let app = spawn_app();
    let (user_id, token) = app.register("ana@example.com").await;

    let (status, body) = app.get("/api/users/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.to_string());
    assert_eq!(body["profile_complete"], false);
    assert!(body.get("password").is_none());

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "Ana@Example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.to_string());
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = spawn_app();
    app.register("ana@example.com").await;

    let (status, body) = app
        .post("/api/auth/register", None, json!({ "email": "ANA@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn registration_validates_fields() {
    let app = spawn_app();

    let (status, body) = app.post("/api/auth/register", None, json!({ "email": "ana@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, _) = app
        .post("/api/auth/register", None, json!({ "email": "not-an-email", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/auth/register", None, json!({ "email": "ana@example.com", "password": "curta" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = spawn_app();
    app.register("ana@example.com").await;

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "ana@example.com", "password": "errada123" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "ghost@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_step_completes_profile() {
    let app = spawn_app();
    let (_, token) = app.register("ana@example.com").await;

    let (status, _) = app
        .post("/api/auth/register/complete", Some(&token), json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/auth/register/complete",
            Some(&token),
            json!({ "name": "Ana", "bio": "Oi!", "interests": ["samba", "cinema"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");
    assert_eq!(body["interests"], json!(["samba", "cinema"]));
    assert_eq!(body["profile_complete"], true);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = spawn_app();

    let (status, body) = app.request(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing or invalid credentials");

    let (status, _) = app.get("/api/auth/validate", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = app.register("ana@example.com").await;
    let (status, body) = app.get("/api/auth/validate", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana@example.com");
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let app = spawn_app();
    let (user_id, _) = app.register("ana@example.com").await;

    let expired = chrono::Utc::now() - chrono::Duration::minutes(5);
    app.state
        .db
        .create_password_reset(&token_hash("old-token"), &user_id.to_string(), expired)
        .unwrap();

    let (status, body) = app
        .post(
            "/api/auth/password-update",
            None,
            json!({ "token": "old-token", "new_password": "novasenha123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reset token expired");

    // Old password still works.
    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "ana@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn valid_reset_token_updates_password_once() {
    let app = spawn_app();
    let (user_id, _) = app.register("ana@example.com").await;

    let expires = chrono::Utc::now() + chrono::Duration::hours(1);
    app.state
        .db
        .create_password_reset(&token_hash("fresh-token"), &user_id.to_string(), expires)
        .unwrap();

    let update = json!({ "token": "fresh-token", "new_password": "novasenha123" });
    let (status, _) = app.post("/api/auth/password-update", None, update.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "ana@example.com", "password": "novasenha123" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/auth/password-update", None, update).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reset token already used");

    let (status, _) = app
        .post(
            "/api/auth/password-update",
            None,
            json!({ "token": "never-issued", "new_password": "novasenha123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_request_does_not_reveal_accounts() {
    let app = spawn_app();
    app.register("ana@example.com").await;

    for email in ["ana@example.com", "ghost@example.com"] {
        let (status, body) = app.post("/api/auth/password-reset", None, json!({ "email": email })).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "sent");
    }
}
