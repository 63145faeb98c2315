use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use coroa_types::api::{Claims, PaymentWebhook, PremiumStatus};
use coroa_types::events::GatewayEvent;

use crate::auth::{AppState, blocking, normalize_email};
use crate::error::{ApiError, ApiJson};

/// What a webhook event does to the premium flag. `None` = acknowledged, ignored.
fn premium_effect(event: &str) -> Option<bool> {
    match event {
        "payment_approved" => Some(true),
        "payment_refunded" | "payment_chargeback" | "subscription_canceled" => Some(false),
        _ => None,
    }
}

/// Compares digests so the check doesn't short-circuit on the raw secret.
fn secret_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// GET /api/premium: data for the upsell popup.
pub async fn premium_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |s| s.db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(PremiumStatus {
        is_premium: row.is_premium,
        checkout_url: state.settings.checkout_url.clone(),
    }))
}

/// POST /api/webhooks/payment: bearer token must equal the webhook secret.
pub async fn payment_webhook(
    State(state): State<AppState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    body: Result<ApiJson<PaymentWebhook>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let TypedHeader(Authorization(bearer)) = auth.map_err(|_| ApiError::Unauthorized)?;
    if !secret_matches(bearer.token(), &state.settings.webhook_secret) {
        warn!("Payment webhook rejected: bad secret");
        return Err(ApiError::Unauthorized);
    }
    // Body errors only surface to authenticated callers.
    let ApiJson(payload) = body?;

    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.event.trim().is_empty() {
        return Err(ApiError::bad_request("event and email are required"));
    }

    let event = payload.event.trim().to_string();
    let effect = premium_effect(&event);
    let event_id = Uuid::new_v4().to_string();

    let updated = blocking(&state, move |s| -> Result<Option<(Uuid, bool)>, ApiError> {
        let Some(premium) = effect else {
            s.db.record_payment_event(&event_id, &event, &email, false)?;
            return Ok(None);
        };

        let user_id = s
            .db
            .set_premium_by_email(&email, premium)?
            .ok_or_else(|| ApiError::not_found("no user with that email"))?;
        s.db.record_payment_event(&event_id, &event, &email, true)?;

        let user_id: Uuid = user_id
            .parse()
            .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user_id, e))?;
        Ok(Some((user_id, premium)))
    })
    .await?;

    let Some((user_id, is_premium)) = updated else {
        info!("Payment webhook event '{}' ignored", payload.event);
        return Ok(Json(json!({ "status": "ignored" })));
    };

    info!("User {} premium set to {} by '{}'", user_id, is_premium, payload.event);
    state
        .dispatcher
        .send_to_user(user_id, GatewayEvent::PremiumUpdate { is_premium })
        .await;

    Ok(Json(json!({ "status": "applied", "is_premium": is_premium })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_premium_changes() {
        assert_eq!(premium_effect("payment_approved"), Some(true));
        assert_eq!(premium_effect("payment_refunded"), Some(false));
        assert_eq!(premium_effect("subscription_canceled"), Some(false));
        assert_eq!(premium_effect("payment_pending"), None);
    }

    #[test]
    fn empty_secret_never_matches() {
        assert!(secret_matches("abc", "abc"));
        assert!(!secret_matches("abd", "abc"));
        assert!(!secret_matches("", ""));
    }
}
