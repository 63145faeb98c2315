#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use coroa_api::{AppState, AppStateInner, Settings, router};
use coroa_db::Database;
use coroa_gateway::dispatcher::Dispatcher;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "hook-secret";
pub const PASSWORD: &str = "segredo123";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

/// Router over an in-memory database, like threshold pinned to 2, instant replies.
pub fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

pub fn spawn_app_with(tweak: impl FnOnce(&mut Settings)) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let mut settings = Settings {
        upload_dir: uploads.path().to_path_buf(),
        webhook_secret: WEBHOOK_SECRET.into(),
        reply_delay: Duration::ZERO,
        like_threshold: Some(2),
        ..Settings::default()
    };
    tweak(&mut settings);
    let state = AppStateInner::new(
        Database::open_in_memory().unwrap(),
        JWT_SECRET.into(),
        Dispatcher::new(),
        settings,
    );
    TestApp {
        router: router(state.clone()),
        state,
        uploads,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Registers and returns (user_id, token).
    pub async fn register(&self, email: &str) -> (Uuid, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let user_id = body["user_id"].as_str().unwrap().parse().unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// Likes `profile_id` until the pinned threshold turns it into a match.
    pub async fn match_with(&self, token: &str, profile_id: &str) {
        for _ in 0..2 {
            let (status, _) = self
                .post(
                    "/api/timeline/like",
                    Some(token),
                    serde_json::json!({ "profile_id": profile_id }),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    /// Polls the conversation until its stage reaches `stage`.
    pub async fn wait_for_stage(&self, token: &str, profile_id: &str, stage: u64) -> Value {
        let uri = format!("/api/conversations/{profile_id}");
        for _ in 0..200 {
            let (status, conv) = self.get(&uri, token).await;
            assert_eq!(status, StatusCode::OK);
            if conv["stage"].as_u64() == Some(stage) {
                return conv;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("conversation with {profile_id} never reached stage {stage}");
    }
}
