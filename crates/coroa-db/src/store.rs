use anyhow::Result;
use coroa_types::storage::Store;

use crate::Database;

/// [`Store`] over the `kv_store` table, scoped to one owning user.
///
/// Keys such as `currentMatch` carry no user id of their own; the scope keeps
/// them apart between users.
pub struct UserStore<'a> {
    db: &'a Database,
    scope: String,
}

impl<'a> UserStore<'a> {
    pub fn new(db: &'a Database, owner: impl ToString) -> Self {
        Self {
            db,
            scope: owner.to_string(),
        }
    }
}

impl Store for UserStore<'_> {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.db.kv_get(&self.scope, key)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.db.kv_put(&self.scope, key, value)
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.db.kv_delete(&self.scope, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coroa_types::storage::{StorageKey, StoreExt};

    #[test]
    fn scopes_do_not_leak() {
        let db = Database::open_in_memory().unwrap();
        let ana = UserStore::new(&db, "ana");
        let bia = UserStore::new(&db, "bia");

        ana.save(&StorageKey::CurrentMatch, &"marcia").unwrap();
        assert_eq!(ana.load::<String>(&StorageKey::CurrentMatch).unwrap().as_deref(), Some("marcia"));
        assert_eq!(bia.load::<String>(&StorageKey::CurrentMatch).unwrap(), None);
    }
}
