use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photo_urls: Vec<String>,
    pub match_ids: Vec<String>,
    pub is_premium: bool,
    pub profile_complete: bool,
    pub created_at: DateTime<Utc>,
}

/// What other users see of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photo_urls: Vec<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            bio: user.bio,
            interests: user.interests,
            photo_urls: user.photo_urls,
        }
    }
}

/// Seed profile shown on the timeline. Static, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: u8,
    pub city: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photo: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub kind: MessageKind,
    pub text: String,
    pub sent_by_user: bool,
    pub timestamp: DateTime<Utc>,
    /// Literal playback length such as `"0:14"`, audio only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Message {
    pub fn text(text: impl Into<String>, sent_by_user: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: MessageKind::Text,
            text: text.into(),
            sent_by_user,
            timestamp,
            duration: None,
        }
    }

    pub fn audio(
        text: impl Into<String>,
        duration: impl Into<String>,
        sent_by_user: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: MessageKind::Audio,
            text: text.into(),
            sent_by_user,
            timestamp,
            duration: Some(duration.into()),
        }
    }
}

/// Scripted conversation between a user and a mock profile.
/// `stage` counts how many script stages have been delivered so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub profile_id: String,
    pub messages: Vec<Message>,
    pub stage: usize,
    /// Stages promised to user messages but not delivered yet.
    #[serde(default)]
    pub pending: usize,
}

/// Cached snapshot of a user's match list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchesSnapshot {
    pub match_ids: Vec<String>,
    pub cached_at: DateTime<Utc>,
}
