use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use coroa_types::models::MatchesSnapshot;
use coroa_types::storage::{StorageKey, Store, StoreExt};

/// How long a cached match list is served before it is rebuilt.
pub const MATCHES_CACHE_TTL_SECS: i64 = 300;

fn ttl() -> Duration {
    Duration::seconds(MATCHES_CACHE_TTL_SECS)
}

/// Cached match list for one user under `matches_cache_<userId>`.
pub struct MatchesCache<'a, S: Store + ?Sized> {
    store: &'a S,
    key: StorageKey,
}

impl<'a, S: Store + ?Sized> MatchesCache<'a, S> {
    pub fn new(store: &'a S, user_id: Uuid) -> Self {
        Self {
            store,
            key: StorageKey::MatchesCache { user_id },
        }
    }

    /// Cached ids if the snapshot is younger than the TTL.
    pub fn get(&self, now: DateTime<Utc>) -> Result<Option<Vec<String>>> {
        let snapshot: Option<MatchesSnapshot> = self.store.load(&self.key)?;
        Ok(snapshot
            .filter(|s| now - s.cached_at < ttl())
            .map(|s| s.match_ids))
    }

    pub fn put(&self, match_ids: &[String], now: DateTime<Utc>) -> Result<()> {
        let snapshot = MatchesSnapshot {
            match_ids: match_ids.to_vec(),
            cached_at: now,
        };
        self.store.save(&self.key, &snapshot)
    }

    pub fn invalidate(&self) -> Result<()> {
        self.store.delete(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coroa_types::storage::MemoryStore;

    #[test]
    fn snapshot_expires_after_ttl() {
        let store = MemoryStore::new();
        let cache = MatchesCache::new(&store, Uuid::new_v4());
        let now = Utc::now();
        let ids = vec!["marcia".to_string()];

        assert_eq!(cache.get(now).unwrap(), None);
        cache.put(&ids, now).unwrap();
        assert_eq!(cache.get(now + Duration::minutes(4)).unwrap(), Some(ids));
        assert_eq!(cache.get(now + ttl()).unwrap(), None);
    }

    #[test]
    fn invalidate_drops_snapshot() {
        let store = MemoryStore::new();
        let cache = MatchesCache::new(&store, Uuid::new_v4());
        let now = Utc::now();
        cache.put(&[], now).unwrap();
        assert_eq!(cache.get(now).unwrap(), Some(vec![]));
        cache.invalidate().unwrap();
        assert_eq!(cache.get(now).unwrap(), None);
    }
}
