//! Database row types, mapped one-to-one from SQLite rows.
//! Kept apart from the coroa-types API models.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photo_urls: Vec<String>,
    pub is_premium: bool,
    pub created_at: String,
}

pub struct PasswordResetRow {
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: String,
    pub used: bool,
}

pub struct PhotoRow {
    pub id: String,
    pub user_id: String,
    pub path: String,
    pub content_type: String,
    pub size: i64,
}
