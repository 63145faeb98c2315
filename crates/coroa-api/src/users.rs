use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use coroa_db::Database;
use coroa_db::models::UserRow;
use coroa_types::api::{Claims, UpdateProfileRequest};
use coroa_types::models::{PublicUser, User};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiJson, ApiPath};

const MAX_BIO_LEN: usize = 500;
const MAX_INTERESTS: usize = 20;
const MAX_INTEREST_LEN: usize = 40;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub(crate) fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}

fn user_from_row(row: UserRow, match_ids: Vec<String>) -> anyhow::Result<User> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", row.id, e))?;
    let created_at = parse_timestamp(&row.created_at, &row.id);
    Ok(User {
        id,
        email: row.email,
        profile_complete: !row.name.is_empty(),
        name: row.name,
        bio: row.bio,
        interests: row.interests,
        photo_urls: row.photo_urls,
        match_ids,
        is_premium: row.is_premium,
        created_at,
    })
}

/// Full user record including the match list. Blocking.
pub(crate) fn load_user(db: &Database, id: &str) -> anyhow::Result<Option<User>> {
    let Some(row) = db.get_user_by_id(id)? else {
        return Ok(None);
    };
    let match_ids = db.get_match_ids(id)?;
    user_from_row(row, match_ids).map(Some)
}

pub(crate) fn validate_profile_fields(
    bio: Option<&str>,
    interests: Option<&[String]>,
) -> Result<(), ApiError> {
    if bio.is_some_and(|b| b.chars().count() > MAX_BIO_LEN) {
        return Err(ApiError::bad_request(format!("bio is limited to {} characters", MAX_BIO_LEN)));
    }
    if let Some(interests) = interests {
        if interests.len() > MAX_INTERESTS {
            return Err(ApiError::bad_request(format!("at most {} interests", MAX_INTERESTS)));
        }
        if interests.iter().any(|i| i.trim().is_empty() || i.chars().count() > MAX_INTEREST_LEN) {
            return Err(ApiError::bad_request("interests must be non-empty short labels"));
        }
    }
    Ok(())
}

/// GET /api/users/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = blocking(&state, move |s| load_user(&s.db, &uid))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(user))
}

/// PUT /api/users/me: partial update.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.as_deref().map(str::trim).map(str::to_string);
    if name.as_deref() == Some("") {
        return Err(ApiError::bad_request("name cannot be empty"));
    }
    validate_profile_fields(req.bio.as_deref(), req.interests.as_deref())?;

    let uid = claims.sub.to_string();
    let user = blocking(&state, move |s| -> Result<User, ApiError> {
        let updated = s.db.update_profile(
            &uid,
            name.as_deref(),
            req.bio.as_deref().map(str::trim),
            req.interests.as_deref(),
        )?;
        if !updated {
            return Err(ApiError::not_found("user not found"));
        }
        load_user(&s.db, &uid)?.ok_or_else(|| ApiError::not_found("user not found"))
    })
    .await?;

    Ok(Json(user))
}

/// GET /api/users/{id}: public view of another user.
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user_id.to_string();
    let user = blocking(&state, move |s| load_user(&s.db, &uid))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(PublicUser::from(user)))
}
