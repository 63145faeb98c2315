use crate::models::{PasswordResetRow, PhotoRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};
use tracing::warn;

const USER_COLUMNS: &str =
    "id, email, password, name, bio, interests, photo_urls, is_premium, created_at";

impl Database {
    // -- Users --

    /// Inserts a user. Returns false if the email is already taken.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Overwrites only the fields that are `Some`. Returns false if the user is gone.
    pub fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        bio: Option<&str>,
        interests: Option<&[String]>,
    ) -> Result<bool> {
        let interests = interests.map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    bio = COALESCE(?3, bio),
                    interests = COALESCE(?4, interests),
                    updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, name, bio, interests],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(changed > 0)
        })
    }

    /// Sets the premium flag by email. Returns the user id, or None if no such user.
    pub fn set_premium_by_email(&self, email: &str, premium: bool) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id: Option<String> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| row.get(0))
                .optional()?;

            if let Some(id) = &id {
                conn.execute(
                    "UPDATE users SET is_premium = ?2, updated_at = datetime('now') WHERE id = ?1",
                    rusqlite::params![id, premium],
                )?;
            }
            Ok(id)
        })
    }

    // -- Photos --

    /// Records an uploaded photo and appends its public URL to the user's list.
    pub fn add_photo(&self, photo: &PhotoRow, url: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO photos (id, user_id, path, content_type, size) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![photo.id, photo.user_id, photo.path, photo.content_type, photo.size],
            )?;

            let raw: String = tx.query_row(
                "SELECT photo_urls FROM users WHERE id = ?1",
                [&photo.user_id],
                |row| row.get(0),
            )?;
            let mut urls = decode_list(&raw, &photo.user_id, "photo_urls");
            urls.push(url.to_string());

            tx.execute(
                "UPDATE users SET photo_urls = ?2, updated_at = datetime('now') WHERE id = ?1",
                (&photo.user_id, serde_json::to_string(&urls)?),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn count_photos(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM photos WHERE user_id = ?1", [user_id], |r| {
                r.get(0)
            })?)
        })
    }

    // -- Matches --

    /// Appends `match_id` to the user's match list. Returns false if it was already there.
    pub fn add_match(&self, user_id: &str, match_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_matches (user_id, match_id) VALUES (?1, ?2)",
                (user_id, match_id),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn remove_match(&self, user_id: &str, match_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM user_matches WHERE user_id = ?1 AND match_id = ?2",
                (user_id, match_id),
            )?;
            Ok(removed == 1)
        })
    }

    pub fn get_match_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_match_ids(conn, user_id))
    }

    pub fn has_match(&self, user_id: &str, match_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM user_matches WHERE user_id = ?1 AND match_id = ?2",
                    (user_id, match_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Password resets --

    pub fn create_password_reset(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (token_hash, user_id, expires_at.to_rfc3339()),
            )?;
            Ok(())
        })
    }

    pub fn get_password_reset(&self, token_hash: &str) -> Result<Option<PasswordResetRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT token_hash, user_id, expires_at, used FROM password_resets WHERE token_hash = ?1",
                    [token_hash],
                    |row| {
                        Ok(PasswordResetRow {
                            token_hash: row.get(0)?,
                            user_id: row.get(1)?,
                            expires_at: row.get(2)?,
                            used: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Marks a reset token as used. Returns false if it was already used.
    pub fn mark_password_reset_used(&self, token_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE password_resets SET used = 1 WHERE token_hash = ?1 AND used = 0",
                [token_hash],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Payments --

    pub fn record_payment_event(&self, id: &str, event: &str, email: &str, applied: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO payment_events (id, event, email, applied) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, event, email, applied],
            )?;
            Ok(())
        })
    }

    // -- Key/value store --

    pub fn kv_get(&self, scope: &str, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE scope = ?1 AND key = ?2",
                    (scope, key),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn kv_put(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (scope, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                (scope, key, value),
            )?;
            Ok(())
        })
    }

    pub fn kv_delete(&self, scope: &str, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE scope = ?1 AND key = ?2", (scope, key))?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    let id: String = row.get(0)?;
    let interests: String = row.get(5)?;
    let photo_urls: String = row.get(6)?;
    Ok(UserRow {
        interests: decode_list(&interests, &id, "interests"),
        photo_urls: decode_list(&photo_urls, &id, "photo_urls"),
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        bio: row.get(4)?,
        is_premium: row.get(7)?,
        created_at: row.get(8)?,
        id,
    })
}

fn query_match_ids(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT match_id FROM user_matches WHERE user_id = ?1 ORDER BY created_at, rowid",
    )?;

    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ids)
}

/// JSON list columns. A corrupt value reads as empty rather than failing the whole row.
fn decode_list(raw: &str, user_id: &str, column: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} on user '{}': {}", column, user_id, e);
        Vec::new()
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
