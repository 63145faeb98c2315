use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use coroa_db::UserStore;
use coroa_engine::{Stepper, catalog};
use coroa_types::api::{Claims, SendMessageRequest, SendMessageResponse};
use coroa_types::events::GatewayEvent;
use coroa_types::models::{Conversation, Message};

use crate::auth::{AppState, AppStateInner, blocking};
use crate::error::{ApiError, ApiJson, ApiPath};

pub(crate) const MAX_MESSAGE_LEN: usize = 1000;

pub(crate) fn validate_text(text: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!("messages are limited to {} characters", MAX_MESSAGE_LEN)));
    }
    Ok(text.to_string())
}

/// Seed profile must exist and be in the user's match list.
fn ensure_matched(s: &AppStateInner, user_id: Uuid, profile_id: &str) -> Result<(), ApiError> {
    if !catalog::is_seed_profile(profile_id) {
        return Err(ApiError::not_found(format!("profile '{}' not found", profile_id)));
    }
    if !s.db.has_match(&user_id.to_string(), profile_id)? {
        return Err(ApiError::Forbidden("not matched with this profile".into()));
    }
    Ok(())
}

fn lock_writes(s: &AppStateInner) -> anyhow::Result<std::sync::MutexGuard<'_, ()>> {
    s.conversation_writes
        .lock()
        .map_err(|e| anyhow::anyhow!("conversation lock poisoned: {}", e))
}

/// GET /api/conversations/{profile_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    ApiPath(profile_id): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let conv = blocking(&state, move |s| -> Result<Conversation, ApiError> {
        ensure_matched(s, user_id, &profile_id)?;
        let store = UserStore::new(&s.db, user_id);
        Ok(Stepper::new(&store, user_id).open(&profile_id)?)
    })
    .await?;

    Ok(Json(conv))
}

/// POST /api/conversations/{profile_id}/messages: records the user's message
/// and schedules the next scripted stage.
pub async fn send_message(
    State(state): State<AppState>,
    ApiPath(profile_id): ApiPath<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = validate_text(&req.text)?;
    let user_id = claims.sub;

    let pid = profile_id.clone();
    let (message, reply_pending) = blocking(&state, move |s| -> Result<(Message, bool), ApiError> {
        ensure_matched(s, user_id, &pid)?;
        let store = UserStore::new(&s.db, user_id);
        let _guard = lock_writes(s)?;
        Ok(Stepper::new(&store, user_id).send(&pid, &text, chrono::Utc::now())?)
    })
    .await?;

    if reply_pending {
        tokio::spawn(deliver_reply(state.clone(), user_id, profile_id));
    }

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message,
            reply_pending,
        }),
    ))
}

/// Waits the configured delay, appends the next stage and pushes it to the
/// user's gateway connection. Failures are logged only.
async fn deliver_reply(state: AppState, user_id: Uuid, profile_id: String) {
    tokio::time::sleep(state.settings.reply_delay).await;

    let pid = profile_id.clone();
    let replies = blocking(&state, move |s| -> anyhow::Result<Vec<Message>> {
        let store = UserStore::new(&s.db, user_id);
        let _guard = lock_writes(s)?;
        Stepper::new(&store, user_id).reply(&pid, chrono::Utc::now())
    })
    .await;

    let replies = match replies {
        Ok(replies) => replies,
        Err(e) => {
            warn!("Scripted reply for {} / {} failed: {}", user_id, profile_id, e);
            return;
        }
    };

    debug!("Delivered {} scripted message(s) from {} to {}", replies.len(), profile_id, user_id);

    for message in replies {
        state
            .dispatcher
            .send_to_user(
                user_id,
                GatewayEvent::ConversationMessage {
                    profile_id: profile_id.clone(),
                    message,
                },
            )
            .await;
    }
}
