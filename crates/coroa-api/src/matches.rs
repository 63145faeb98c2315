use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use coroa_db::{Database, UserStore};
use coroa_engine::{MatchesCache, Stepper, catalog};
use coroa_types::api::{AddMatchRequest, Claims, MatchEntry, MatchListResponse};

use crate::auth::{AppStateInner, AppState, blocking};
use crate::error::{ApiError, ApiJson, ApiPath};

/// A match is mutual when both match lists contain each other.
/// Seed profiles always like back.
pub(crate) fn is_mutual(db: &Database, user_id: Uuid, match_id: &str) -> anyhow::Result<bool> {
    if catalog::is_seed_profile(match_id) {
        return Ok(true);
    }
    if !db.has_match(&user_id.to_string(), match_id)? {
        return Ok(false);
    }
    db.has_match(match_id, &user_id.to_string())
}

fn entry_for(db: &Database, user_id: Uuid, match_id: String) -> anyhow::Result<MatchEntry> {
    let profile = catalog::find(&match_id).map(|p| p.to_profile());
    let mutual = is_mutual(db, user_id, &match_id)?;
    Ok(MatchEntry {
        match_id,
        mutual,
        profile,
    })
}

/// Appends a match, drops the cached list and, for seed profiles, opens the
/// scripted conversation at stage 0. Blocking.
pub(crate) fn record_match(s: &AppStateInner, user_id: Uuid, match_id: &str) -> anyhow::Result<bool> {
    let added = s.db.add_match(&user_id.to_string(), match_id)?;
    let store = UserStore::new(&s.db, user_id);
    MatchesCache::new(&store, user_id).invalidate()?;

    if catalog::is_seed_profile(match_id) {
        let _guard = s
            .conversation_writes
            .lock()
            .map_err(|e| anyhow::anyhow!("conversation lock poisoned: {}", e))?;
        Stepper::new(&store, user_id).initialize(match_id)?;
    }
    Ok(added)
}

/// GET /api/matches
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let response = blocking(&state, move |s| -> anyhow::Result<MatchListResponse> {
        let store = UserStore::new(&s.db, user_id);
        let cache = MatchesCache::new(&store, user_id);
        let now = chrono::Utc::now();

        let (ids, cached) = match cache.get(now)? {
            Some(ids) => (ids, true),
            None => {
                let ids = s.db.get_match_ids(&user_id.to_string())?;
                if let Err(e) = cache.put(&ids, now) {
                    warn!("Failed to cache matches for {}: {}", user_id, e);
                }
                (ids, false)
            }
        };

        let matches = ids
            .into_iter()
            .map(|id| entry_for(&s.db, user_id, id))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(MatchListResponse { matches, cached })
    })
    .await?;

    Ok(Json(response))
}

/// POST /api/matches: idempotent append.
pub async fn add_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<AddMatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let match_id = req.match_id.trim().to_string();
    if match_id.is_empty() {
        return Err(ApiError::bad_request("match_id is required"));
    }

    let user_id = claims.sub;
    if match_id == user_id.to_string() {
        return Err(ApiError::bad_request("cannot match with yourself"));
    }

    let mid = match_id.clone();
    let (added, mutual) = blocking(&state, move |s| -> Result<(bool, bool), ApiError> {
        if !catalog::is_seed_profile(&mid) && s.db.get_user_by_id(&mid)?.is_none() {
            return Err(ApiError::not_found("no such profile or user"));
        }
        let added = record_match(s, user_id, &mid)?;
        let mutual = is_mutual(&s.db, user_id, &mid)?;
        Ok((added, mutual))
    })
    .await?;

    if added {
        info!("User {} matched {}", user_id, match_id);
    }

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({ "match_id": match_id, "added": added, "mutual": mutual })),
    ))
}

/// DELETE /api/matches/{match_id}
pub async fn remove_match(
    State(state): State<AppState>,
    ApiPath(match_id): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let mid = match_id.clone();
    blocking(&state, move |s| -> Result<(), ApiError> {
        if !s.db.remove_match(&user_id.to_string(), &mid)? {
            return Err(ApiError::not_found("match not found"));
        }
        let store = UserStore::new(&s.db, user_id);
        MatchesCache::new(&store, user_id).invalidate()?;

        // Unmatching a seed profile drops its scripted conversation.
        if catalog::is_seed_profile(&mid) {
            let _guard = s
                .conversation_writes
                .lock()
                .map_err(|e| anyhow::anyhow!("conversation lock poisoned: {}", e))?;
            Stepper::new(&store, user_id).delete(&mid)?;
        }
        Ok(())
    })
    .await?;

    info!("User {} removed match {}", user_id, match_id);
    Ok(StatusCode::NO_CONTENT)
}
