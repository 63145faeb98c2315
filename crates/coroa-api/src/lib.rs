pub mod auth;
pub mod chats;
pub mod conversations;
pub mod error;
pub mod matches;
pub mod middleware;
pub mod payments;
pub mod photos;
pub mod timeline;
pub mod users;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

pub use auth::{AppState, AppStateInner, Settings};
pub use error::ApiError;

/// Multipart framing on top of the photo itself.
const PHOTO_BODY_LIMIT: usize = photos::MAX_PHOTO_SIZE + 64 * 1024;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// All `/api` routes. Auth is enforced per route group, not globally.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/password-reset", post(auth::request_password_reset))
        .route("/api/auth/password-update", post(auth::update_password))
        .route("/api/webhooks/payment", post(payments::payment_webhook));

    let protected_routes = Router::new()
        .route("/api/auth/register/complete", post(auth::complete_registration))
        .route("/api/auth/validate", get(auth::validate))
        .route("/api/users/me", get(users::get_me).put(users::update_me))
        .route(
            "/api/users/me/photos",
            post(photos::upload_photo).layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT)),
        )
        .route("/api/users/{user_id}", get(users::get_user))
        .route("/api/matches", get(matches::list_matches).post(matches::add_match))
        .route("/api/matches/{match_id}", delete(matches::remove_match))
        .route("/api/profiles", get(timeline::list_profiles))
        .route("/api/profiles/{profile_id}", get(timeline::get_profile))
        .route("/api/timeline/like", post(timeline::like))
        .route("/api/timeline/dislike", post(timeline::dislike))
        .route("/api/timeline/current-match", get(timeline::current_match))
        .route("/api/conversations/{profile_id}", get(conversations::get_conversation))
        .route("/api/conversations/{profile_id}/messages", post(conversations::send_message))
        .route("/api/chats/{match_id}", get(chats::get_chat))
        .route("/api/chats/{match_id}/messages", post(chats::send_chat_message))
        .route("/api/premium", get(payments::premium_status))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
