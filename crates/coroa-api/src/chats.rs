use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use coroa_db::UserStore;
use coroa_engine::catalog;
use coroa_types::api::{Claims, SendMessageRequest};
use coroa_types::events::GatewayEvent;
use coroa_types::models::Message;
use coroa_types::storage::{StorageKey, StoreExt};

use crate::auth::{AppState, AppStateInner, blocking};
use crate::conversations::validate_text;
use crate::error::{ApiError, ApiJson, ApiPath};
use crate::matches::is_mutual;

/// Chat peers are real users. Seed profiles talk through their scripted conversation.
fn peer_from_path(raw: &str) -> Result<Uuid, ApiError> {
    if catalog::is_seed_profile(raw) {
        return Err(ApiError::Forbidden("seed profiles only reply in their conversation".into()));
    }
    raw.parse().map_err(|_| ApiError::not_found("user not found"))
}

/// Chats are only open between two users who matched each other.
fn ensure_mutual(s: &AppStateInner, user_id: Uuid, peer_id: Uuid) -> Result<(), ApiError> {
    if s.db.get_user_by_id(&peer_id.to_string())?.is_none() {
        return Err(ApiError::not_found("user not found"));
    }
    if !is_mutual(&s.db, user_id, &peer_id.to_string())? {
        return Err(ApiError::Forbidden("chat requires a mutual match".into()));
    }
    Ok(())
}

fn append(s: &AppStateInner, owner: Uuid, peer: Uuid, message: &Message) -> anyhow::Result<()> {
    let store = UserStore::new(&s.db, owner);
    let key = StorageKey::chat(owner, &peer.to_string());
    let mut history: Vec<Message> = store.load(&key)?.unwrap_or_default();
    history.push(message.clone());
    store.save(&key, &history)
}

/// GET /api/chats/{match_id}
pub async fn get_chat(
    State(state): State<AppState>,
    ApiPath(peer): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let peer_id = peer_from_path(&peer)?;
    let user_id = claims.sub;
    let history = blocking(&state, move |s| -> Result<Vec<Message>, ApiError> {
        ensure_mutual(s, user_id, peer_id)?;
        let store = UserStore::new(&s.db, user_id);
        let history: Option<Vec<Message>> = store.load(&StorageKey::chat(user_id, &peer_id.to_string()))?;
        Ok(history.unwrap_or_default())
    })
    .await?;

    Ok(Json(history))
}

/// POST /api/chats/{match_id}/messages: stored on both sides, pushed to the peer.
pub async fn send_chat_message(
    State(state): State<AppState>,
    ApiPath(peer): ApiPath<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let peer_id = peer_from_path(&peer)?;
    let text = validate_text(&req.text)?;
    let user_id = claims.sub;

    let mine = Message::text(text, true, chrono::Utc::now());
    let theirs = Message {
        sent_by_user: false,
        ..mine.clone()
    };

    let (m, t) = (mine.clone(), theirs.clone());
    blocking(&state, move |s| -> Result<(), ApiError> {
        ensure_mutual(s, user_id, peer_id)?;
        let _guard = s
            .conversation_writes
            .lock()
            .map_err(|e| anyhow::anyhow!("conversation lock poisoned: {}", e))?;
        append(s, user_id, peer_id, &m)?;
        append(s, peer_id, user_id, &t)?;
        Ok(())
    })
    .await?;

    let delivered = state
        .dispatcher
        .send_to_user(
            peer_id,
            GatewayEvent::ChatMessage {
                from_user_id: user_id,
                message: theirs,
            },
        )
        .await;
    debug!("Chat message {} -> {} (live: {})", user_id, peer_id, delivered);

    Ok((StatusCode::CREATED, Json(mine)))
}
