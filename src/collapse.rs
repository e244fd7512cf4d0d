//! Collapsed/expanded flags per group, persisted in the local storage tier.
//!
//! The browser forgets our preferred popup shape across sessions, so this
//! store is authoritative for rendering once a value exists. Missing entries
//! are seeded lazily from the live flag on first read; bulk reads never seed.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, json};

use crate::error::Error;
use crate::host::KeyValueStore;

/// Storage key holding the whole `group key → collapsed` object.
const COLLAPSED_KEY: &str = "collapsedGroups";

pub struct CollapseStore {
    store: Rc<dyn KeyValueStore>,
}

impl CollapseStore {
    pub fn new(store: Rc<dyn KeyValueStore>) -> CollapseStore {
        CollapseStore { store }
    }

    /// Stored flag for `key`, seeding from `live` (and persisting it) when
    /// no entry exists yet.
    pub async fn get(&self, key: &str, live: bool) -> Result<bool, Error> {
        let mut map = self.read_map().await?;
        if let Some(collapsed) = map.get(key) {
            return Ok(*collapsed);
        }

        map.insert(key.to_string(), live);
        self.write_map(&map).await?;
        Ok(live)
    }

    /// Unconditional overwrite, durable immediately.
    pub async fn set(&self, key: &str, collapsed: bool) -> Result<(), Error> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), collapsed);
        self.write_map(&map).await
    }

    /// Set many keys to one value in a single durable write.
    pub async fn set_many(&self, keys: &[String], collapsed: bool) -> Result<(), Error> {
        let mut map = self.read_map().await?;
        for key in keys {
            map.insert(key.clone(), collapsed);
        }
        self.write_map(&map).await
    }

    /// Bulk read for render time. Does not seed missing entries.
    pub async fn get_all(&self) -> Result<BTreeMap<String, bool>, Error> {
        self.read_map().await
    }

    async fn read_map(&self) -> Result<BTreeMap<String, bool>, Error> {
        let mut entries = self.store.read(&[COLLAPSED_KEY]).await?;
        match entries.remove(COLLAPSED_KEY) {
            Some(value) => serde_json::from_value(value)
                .map_err(|err| Error::SettingsPersistence(err.to_string())),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, bool>) -> Result<(), Error> {
        let mut entries = Map::new();
        entries.insert(COLLAPSED_KEY.to_string(), json!(map));
        self.store.write(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MemoryStore;
    use crate::tab_data::UNGROUPED_KEY;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_get_seeds_from_live_value() {
        let store = Rc::new(MemoryStore::new());
        let collapse = CollapseStore::new(store.clone());

        assert!(block_on(collapse.get("42", true)).unwrap());
        // The seed was persisted, so the bulk read now includes it.
        let all = block_on(collapse.get_all()).unwrap();
        assert_eq!(all.get("42"), Some(&true));
        assert_eq!(store.writes.get(), 1);
    }

    #[test]
    fn test_get_prefers_stored_over_live() {
        let store = MemoryStore::new().with_entry(COLLAPSED_KEY, json!({"42": false}));
        let collapse = CollapseStore::new(Rc::new(store));

        // Live says collapsed; the stored value is authoritative.
        assert!(!block_on(collapse.get("42", true)).unwrap());
    }

    #[test]
    fn test_get_does_not_rewrite_existing_entries() {
        let store = Rc::new(MemoryStore::new());
        let collapse = CollapseStore::new(store.clone());

        block_on(collapse.set("42", true)).unwrap();
        let writes = store.writes.get();
        block_on(collapse.get("42", false)).unwrap();
        assert_eq!(store.writes.get(), writes);
    }

    #[test]
    fn test_get_all_does_not_seed() {
        let store = Rc::new(MemoryStore::new());
        let collapse = CollapseStore::new(store.clone());

        let all = block_on(collapse.get_all()).unwrap();
        assert!(all.is_empty());
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn test_set_overwrites() {
        let collapse = CollapseStore::new(Rc::new(MemoryStore::new()));

        block_on(collapse.set("7", true)).unwrap();
        block_on(collapse.set("7", false)).unwrap();

        assert!(!block_on(collapse.get("7", true)).unwrap());
    }

    #[test]
    fn test_set_many_includes_ungrouped_key() {
        let collapse = CollapseStore::new(Rc::new(MemoryStore::new()));
        let keys = vec!["1".to_string(), "2".to_string(), UNGROUPED_KEY.to_string()];

        block_on(collapse.set_many(&keys, true)).unwrap();

        let all = block_on(collapse.get_all()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.values().all(|collapsed| *collapsed));
    }

    #[test]
    fn test_store_failure_surfaces() {
        let store = MemoryStore::new();
        store.fail_writes();
        let collapse = CollapseStore::new(Rc::new(store));

        let err = block_on(collapse.set("1", true)).unwrap_err();
        assert_eq!(err.kind(), "settings_persistence_failed");
    }
}
