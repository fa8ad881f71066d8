use crate::storage::{KeyValueStore, FAVORITES_KEY};

/// Saved job ids, kept in the order they were saved and written back to the
/// store in full after every toggle.
pub struct Favorites<'a> {
    store: &'a dyn KeyValueStore,
    ids: Vec<u32>,
}

impl<'a> Favorites<'a> {
    /// Reads the saved set. Missing, unreadable or malformed data gives an
    /// empty set.
    pub fn load(store: &'a dyn KeyValueStore) -> Self {
        let ids = match store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => parse_ids(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read favorites, starting empty: {:#}", e);
                Vec::new()
            }
        };
        Self { store, ids }
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Adds `id` if absent, removes it if present, then persists. A failed
    /// write is logged and the in-memory set stays authoritative.
    pub fn toggle(&mut self, id: u32) -> &[u32] {
        if let Some(pos) = self.ids.iter().position(|&saved| saved == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
        self.persist();
        &self.ids
    }

    fn persist(&self) {
        let encoded = match serde_json::to_string(&self.ids) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("Could not encode favorites: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(FAVORITES_KEY, &encoded) {
            tracing::warn!("Could not save favorites: {:#}", e);
        }
    }
}

fn parse_ids(raw: &str) -> Vec<u32> {
    match serde_json::from_str::<Vec<u32>>(raw) {
        Ok(mut ids) => {
            // a hand-edited store may repeat ids
            let mut seen = std::collections::HashSet::new();
            ids.retain(|id| seen.insert(*id));
            ids
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed favorites {:?}: {}", raw, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::ReadOnlyStore;
    use crate::storage::SqliteStore;

    #[test]
    fn test_toggle_five_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut favorites = Favorites::load(&store);
        assert!(favorites.ids().is_empty());

        assert_eq!(favorites.toggle(5), &[5]);
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some("[5]"));

        assert!(favorites.toggle(5).is_empty());
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut favorites = Favorites::load(&store);
        favorites.toggle(1);
        favorites.toggle(3);

        for id in [1, 2, 3, 99] {
            let before = favorites.is_favorite(id);
            favorites.toggle(id);
            assert_ne!(favorites.is_favorite(id), before);
            favorites.toggle(id);
            assert_eq!(favorites.is_favorite(id), before);
        }
    }

    #[test]
    fn test_keeps_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut favorites = Favorites::load(&store);
        favorites.toggle(7);
        favorites.toggle(2);
        favorites.toggle(9);
        favorites.toggle(2);
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some("[7,9]"));
    }

    #[test]
    fn test_load_reads_previous_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let mut favorites = Favorites::load(&store);
            favorites.toggle(12);
            favorites.toggle(40);
        }
        let favorites = Favorites::load(&store);
        assert_eq!(favorites.ids(), &[12, 40]);
        assert!(favorites.is_favorite(40));
        assert!(!favorites.is_favorite(41));
    }

    #[test]
    fn test_malformed_storage_gives_empty_set() {
        for raw in ["", "not json", "{\"a\":1}", "[1,\"two\"]", "[-4]", "null"] {
            let store = SqliteStore::open_in_memory().unwrap();
            store.set(FAVORITES_KEY, raw).unwrap();
            let favorites = Favorites::load(&store);
            assert!(favorites.ids().is_empty(), "{:?} should load as empty", raw);
        }
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set(FAVORITES_KEY, "[3,3,4]").unwrap();
        assert_eq!(Favorites::load(&store).ids(), &[3, 4]);
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let store = ReadOnlyStore::with(FAVORITES_KEY, "[1]");
        let mut favorites = Favorites::load(&store);
        favorites.toggle(2);
        assert_eq!(favorites.ids(), &[1, 2]);
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some("[1]"));
    }
}
