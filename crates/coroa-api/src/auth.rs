use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};
use uuid::Uuid;

use coroa_db::Database;
use coroa_engine::LikeCounter;
use coroa_gateway::dispatcher::Dispatcher;
use coroa_types::api::{
    Claims, CompleteProfileRequest, LoginRequest, LoginResponse, PasswordResetRequest,
    PasswordUpdateRequest, RegisterRequest, RegisterResponse,
};
use coroa_types::models::User;

use crate::error::{ApiError, ApiJson};
use crate::users::{load_user, validate_profile_fields};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub settings: Settings,
    /// Timeline like counters, one per user, kept in memory.
    pub like_counters: tokio::sync::Mutex<HashMap<Uuid, LikeCounter>>,
    /// Serializes read-modify-write cycles on conversation and chat blobs.
    pub conversation_writes: Mutex<()>,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, dispatcher: Dispatcher, settings: Settings) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            dispatcher,
            settings,
            like_counters: tokio::sync::Mutex::new(HashMap::new()),
            conversation_writes: Mutex::new(()),
        })
    }
}

/// Runtime knobs the handlers need, filled from the server's config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub public_url: String,
    pub upload_dir: PathBuf,
    pub webhook_secret: String,
    pub checkout_url: String,
    pub reply_delay: Duration,
    /// Pins the like threshold instead of drawing it at random.
    pub like_threshold: Option<u32>,
    pub reset_token_ttl: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".into(),
            upload_dir: PathBuf::from("./uploads"),
            webhook_secret: String::new(),
            checkout_url: "https://pay.minhacoroa.app/checkout".into(),
            reply_delay: Duration::from_secs(2),
            like_threshold: None,
            reset_token_ttl: chrono::Duration::hours(1),
        }
    }
}

/// Runs blocking work (DB, hashing) off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("background task failed"))
        })?
        .map_err(Into::into)
}

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request("email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(ApiError::bad_request("email is invalid")),
    }
    validate_password(password)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Reset tokens are stored hashed; only the emailed token can redeem one.
fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn new_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// POST /api/auth/register: step 1, account with email + password.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    validate_credentials(&email, &req.password)?;

    let user_id = Uuid::new_v4();
    let uid = user_id.to_string();
    let mail = email.clone();
    blocking(&state, move |s| -> Result<(), ApiError> {
        let password_hash = hash_password(&req.password)?;
        if !s.db.create_user(&uid, &mail, &password_hash)? {
            return Err(ApiError::Conflict("email already registered".into()));
        }
        Ok(())
    })
    .await?;

    info!("Registered user {} ({})", user_id, email);

    let token = create_token(&state.jwt_secret, user_id, &email)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

/// POST /api/auth/register/complete: step 2, the public profile.
pub async fn complete_registration(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CompleteProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    validate_profile_fields(Some(&req.bio), Some(&req.interests))?;

    let user_id = claims.sub;
    let user = blocking(&state, move |s| -> Result<User, ApiError> {
        let uid = user_id.to_string();
        if !s.db.update_profile(&uid, Some(&name), Some(req.bio.trim()), Some(&req.interests))? {
            return Err(ApiError::not_found("user not found"));
        }
        load_user(&s.db, &uid)?.ok_or_else(|| ApiError::not_found("user not found"))
    })
    .await?;

    Ok(Json(user))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let user = blocking(&state, move |s| -> Result<User, ApiError> {
        let Some(row) = s.db.get_user_by_email(&email)? else {
            return Err(ApiError::Unauthorized);
        };

        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", row.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        load_user(&s.db, &row.id)?.ok_or(ApiError::Unauthorized)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
        user,
    }))
}

/// POST /api/auth/password-reset: always 202 so callers can't probe for accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    let ttl = state.settings.reset_token_ttl;
    let public_url = state.settings.public_url.clone();
    blocking(&state, move |s| -> Result<(), ApiError> {
        let Some(user) = s.db.get_user_by_email(&email)? else {
            debug!("Password reset for unknown email {}", email);
            return Ok(());
        };

        let token = new_reset_token();
        let expires_at = chrono::Utc::now() + ttl;
        s.db.create_password_reset(&hash_reset_token(&token), &user.id, expires_at)?;

        info!("Password reset issued for user {}", user.id);
        debug!("Reset link: {}/reset-password?token={}", public_url.trim_end_matches('/'), token);
        Ok(())
    })
    .await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "sent" }))))
}

/// POST /api/auth/password-update: redeems a reset token.
pub async fn update_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }
    validate_password(&req.new_password)?;

    let token_hash = hash_reset_token(req.token.trim());
    blocking(&state, move |s| -> Result<(), ApiError> {
        let reset = s
            .db
            .get_password_reset(&token_hash)?
            .ok_or_else(|| ApiError::bad_request("invalid reset token"))?;

        if reset.used {
            return Err(ApiError::bad_request("reset token already used"));
        }

        let expires_at = chrono::DateTime::parse_from_rfc3339(&reset.expires_at)
            .map_err(|e| anyhow::anyhow!("corrupt expires_at on reset token: {}", e))?;
        if expires_at <= chrono::Utc::now() {
            return Err(ApiError::bad_request("reset token expired"));
        }

        if !s.db.mark_password_reset_used(&reset.token_hash)? {
            return Err(ApiError::bad_request("reset token already used"));
        }

        let password_hash = hash_password(&req.new_password)?;
        if !s.db.set_password(&reset.user_id, &password_hash)? {
            return Err(ApiError::not_found("user not found"));
        }

        info!("Password updated for user {}", reset.user_id);
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "status": "updated" })))
}

/// GET /api/auth/validate: checks that the token's user still exists.
pub async fn validate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = blocking(&state, move |s| load_user(&s.db, &uid))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(user))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation() {
        assert!(validate_credentials("ana@example.com", "segredo123").is_ok());
        assert!(validate_credentials("", "segredo123").is_err());
        assert!(validate_credentials("ana", "segredo123").is_err());
        assert!(validate_credentials("@example.com", "segredo123").is_err());
        assert!(validate_credentials("ana@example.com", "curta").is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn reset_tokens_are_random_and_hashed() {
        let a = new_reset_token();
        let b = new_reset_token();
        assert_ne!(a, b);
        assert_eq!(hash_reset_token(&a).len(), 64);
        assert_eq!(hash_reset_token(&a), hash_reset_token(&a));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("segredo123").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"segredo123", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"errada123", &parsed).is_err());
    }
}
