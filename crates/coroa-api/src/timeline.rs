use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use coroa_db::UserStore;
use coroa_engine::{LikeCounter, catalog, likes};
use coroa_types::api::{Claims, LikeResponse, SwipeRequest};
use coroa_types::events::GatewayEvent;
use coroa_types::models::Profile;
use coroa_types::storage::{StorageKey, StoreExt};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiJson, ApiPath};
use crate::matches::record_match;

fn seed_profile(id: &str) -> Result<&'static catalog::SeedProfile, ApiError> {
    catalog::find(id).ok_or_else(|| ApiError::not_found(format!("profile '{}' not found", id)))
}

/// GET /api/profiles: seed profiles the user has not matched yet.
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let matched = blocking(&state, move |s| s.db.get_match_ids(&uid)).await?;

    let profiles: Vec<Profile> = catalog::profiles()
        .iter()
        .filter(|p| !matched.iter().any(|m| m == p.id))
        .map(|p| p.to_profile())
        .collect();

    Ok(Json(profiles))
}

/// GET /api/profiles/{id}
pub async fn get_profile(
    ApiPath(profile_id): ApiPath<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(seed_profile(&profile_id)?.to_profile()))
}

/// POST /api/timeline/like: counts toward the next match.
pub async fn like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = seed_profile(req.profile_id.trim())?;
    let user_id = claims.sub;

    let pinned = state.settings.like_threshold;
    let draw = move || pinned.unwrap_or_else(likes::random_threshold);

    // The match is claimed and the round rearmed before the lock is released.
    let (likes, claimed) = {
        let mut counters = state.like_counters.lock().await;
        let counter = counters
            .entry(user_id)
            .or_insert_with(|| LikeCounter::new(draw()));

        let matched = counter.like();
        let likes = counter.likes();
        debug!("User {} liked {} ({}/{})", user_id, profile.id, likes, counter.threshold());

        let claimed = matched.then(|| {
            let round = counter.clone();
            counter.rearm(draw());
            round
        });
        (likes, claimed)
    };

    let Some(round) = claimed else {
        return Ok(Json(LikeResponse {
            matched: false,
            likes,
            profile: None,
        }));
    };

    let profile_id = profile.id;
    let stored = blocking(&state, move |s| -> anyhow::Result<()> {
        record_match(s, user_id, profile_id)?;
        UserStore::new(&s.db, user_id).save(&StorageKey::CurrentMatch, &profile_id)?;
        Ok(())
    })
    .await;

    if let Err(e) = stored {
        // Put the finished round back so the next like matches again.
        state.like_counters.lock().await.insert(user_id, round);
        return Err(e);
    }

    info!("User {} matched seed profile {} after {} likes", user_id, profile.id, likes);

    let matched_profile = profile.to_profile();
    state
        .dispatcher
        .send_to_user(user_id, GatewayEvent::MatchCreate { profile: matched_profile.clone() })
        .await;

    Ok(Json(LikeResponse {
        matched: true,
        likes,
        profile: Some(matched_profile),
    }))
}

/// POST /api/timeline/dislike: moves on without touching the like counter.
pub async fn dislike(
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = seed_profile(req.profile_id.trim())?;
    debug!("User {} passed on {}", claims.sub, profile.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/timeline/current-match: the last match the timeline produced.
pub async fn current_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let current: Option<String> = blocking(&state, move |s| {
        UserStore::new(&s.db, user_id).load(&StorageKey::CurrentMatch)
    })
    .await?;

    let profile = current
        .as_deref()
        .and_then(catalog::find)
        .ok_or_else(|| ApiError::not_found("no current match"))?;

    Ok(Json(profile.to_profile()))
}
