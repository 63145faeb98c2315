use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Profile, User};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Second registration step: fills in the public profile.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteProfileRequest {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordUpdateRequest {
    pub token: String,
    pub new_password: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoUploadResponse {
    pub url: String,
}

// -- Matches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMatchRequest {
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEntry {
    pub match_id: String,
    pub mutual: bool,
    /// Present when the match is a seed profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchEntry>,
    pub cached: bool,
}

// -- Timeline --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeRequest {
    pub profile_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub matched: bool,
    pub likes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

// -- Conversations & chats --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: Message,
    /// False once the script is exhausted and no reply will follow.
    pub reply_pending: bool,
}

// -- Premium --

#[derive(Debug, Serialize, Deserialize)]
pub struct PremiumStatus {
    pub is_premium: bool,
    pub checkout_url: String,
}

/// Payment provider callback. Providers send extra fields; only these matter.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub event: String,
    pub email: String,
}
