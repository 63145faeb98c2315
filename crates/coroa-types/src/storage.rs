//! Typed key namespace and the persistence interface behind it.
//!
//! Every piece of per-user state the app keeps outside the relational tables
//! (conversations, chat logs, cached match lists, the last timeline match)
//! goes through [`Store`] under a [`StorageKey`]. Values are JSON blobs.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AuthToken,
    UserId,
    User,
    CurrentMatch,
    MatchesCache { user_id: Uuid },
    Conversation { user_id: Uuid, profile_id: String },
    Chat { user_id: Uuid, match_id: String },
}

const MATCHES_CACHE_PREFIX: &str = "matches_cache_";
const CONVERSATION_PREFIX: &str = "conversa_";
const CHAT_PREFIX: &str = "chat_";

impl StorageKey {
    pub fn conversation(user_id: Uuid, profile_id: &str) -> Self {
        Self::Conversation { user_id, profile_id: profile_id.to_string() }
    }

    pub fn chat(user_id: Uuid, match_id: &str) -> Self {
        Self::Chat { user_id, match_id: match_id.to_string() }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthToken => f.write_str("authToken"),
            Self::UserId => f.write_str("userId"),
            Self::User => f.write_str("user"),
            Self::CurrentMatch => f.write_str("currentMatch"),
            Self::MatchesCache { user_id } => write!(f, "{MATCHES_CACHE_PREFIX}{user_id}"),
            Self::Conversation { user_id, profile_id } => {
                write!(f, "{CONVERSATION_PREFIX}{user_id}_{profile_id}")
            }
            Self::Chat { user_id, match_id } => write!(f, "{CHAT_PREFIX}{user_id}_{match_id}"),
        }
    }
}

/// Splits `<uuid>_<rest>`. UUIDs never contain underscores, so the first one
/// is the separator and `rest` may contain more.
fn split_owner(s: &str) -> Result<(Uuid, String)> {
    let (user, rest) = s
        .split_once('_')
        .ok_or_else(|| anyhow!("missing separator in storage key suffix '{}'", s))?;
    if rest.is_empty() {
        bail!("empty id in storage key suffix '{}'", s);
    }
    Ok((user.parse()?, rest.to_string()))
}

impl FromStr for StorageKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "authToken" => return Ok(Self::AuthToken),
            "userId" => return Ok(Self::UserId),
            "user" => return Ok(Self::User),
            "currentMatch" => return Ok(Self::CurrentMatch),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix(MATCHES_CACHE_PREFIX) {
            return Ok(Self::MatchesCache { user_id: rest.parse()? });
        }
        if let Some(rest) = s.strip_prefix(CONVERSATION_PREFIX) {
            let (user_id, profile_id) = split_owner(rest)?;
            return Ok(Self::Conversation { user_id, profile_id });
        }
        if let Some(rest) = s.strip_prefix(CHAT_PREFIX) {
            let (user_id, match_id) = split_owner(rest)?;
            return Ok(Self::Chat { user_id, match_id });
        }

        bail!("unknown storage key '{}'", s)
    }
}

/// Raw string key/value persistence.
pub trait Store: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn put_raw(&self, key: &str, value: &str) -> Result<()>;
    fn remove_raw(&self, key: &str) -> Result<()>;
}

/// Typed access on top of any [`Store`].
pub trait StoreExt: Store {
    fn load<T: DeserializeOwned>(&self, key: &StorageKey) -> Result<Option<T>> {
        match self.get_raw(&key.to_string())? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: &StorageKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(&key.to_string(), &raw)
    }

    fn delete(&self, key: &StorageKey) -> Result<()> {
        self.remove_raw(&key.to_string())
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Process-local store, used by tests and tooling.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|e| anyhow!("store lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow!("store lock poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow!("store lock poisoned: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> Uuid {
        "6f1c2b1e-3f7a-4c47-9a51-0c1f1b8f2d10".parse().unwrap()
    }

    #[test]
    fn session_keys_render_literally() {
        assert_eq!(StorageKey::AuthToken.to_string(), "authToken");
        assert_eq!(StorageKey::UserId.to_string(), "userId");
        assert_eq!(StorageKey::User.to_string(), "user");
        assert_eq!(StorageKey::CurrentMatch.to_string(), "currentMatch");
    }

    #[test]
    fn scoped_keys_embed_ids() {
        let user_id = uid();
        assert_eq!(
            StorageKey::MatchesCache { user_id }.to_string(),
            format!("matches_cache_{user_id}")
        );
        assert_eq!(
            StorageKey::conversation(user_id, "marcia").to_string(),
            format!("conversa_{user_id}_marcia")
        );
        assert_eq!(
            StorageKey::chat(user_id, "abc").to_string(),
            format!("chat_{user_id}_abc")
        );
    }

    #[test]
    fn parse_accepts_rendered_keys() {
        let user_id = uid();
        let keys = [
            StorageKey::CurrentMatch,
            StorageKey::MatchesCache { user_id },
            StorageKey::conversation(user_id, "dona_rosa"),
            StorageKey::chat(user_id, "7c3e0c2a-2d7e-4a43-8f0c-2b9b3c0e7e11"),
        ];
        for key in keys {
            let parsed: StorageKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("nope".parse::<StorageKey>().is_err());
        assert!("conversa_not-a-uuid_x".parse::<StorageKey>().is_err());
        assert!(format!("conversa_{}_", uid()).parse::<StorageKey>().is_err());
        assert!("matches_cache_".parse::<StorageKey>().is_err());
    }

    #[test]
    fn typed_save_load_delete() {
        let store = MemoryStore::new();
        let key = StorageKey::CurrentMatch;

        assert_eq!(store.load::<String>(&key).unwrap(), None);
        store.save(&key, &"marcia".to_string()).unwrap();
        assert_eq!(store.load::<String>(&key).unwrap().as_deref(), Some("marcia"));
        assert_eq!(store.len(), 1);

        store.delete(&key).unwrap();
        assert!(store.is_empty());
    }
}
