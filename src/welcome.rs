use crate::storage::{KeyValueStore, VISITED_KEY};

/// One-time onboarding gate, keyed on a flag in the store.
pub struct FirstVisitGate<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> FirstVisitGate<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// True iff the visited flag has never been written. An unreadable
    /// store counts as a first visit.
    pub fn should_show_welcome(&self) -> bool {
        match self.store.get(VISITED_KEY) {
            Ok(flag) => flag.is_none(),
            Err(e) => {
                tracing::warn!("Could not read first-visit flag: {:#}", e);
                true
            }
        }
    }

    pub fn mark_visited(&self) {
        if let Err(e) = self.store.set(VISITED_KEY, "true") {
            tracing::warn!("Could not save first-visit flag: {:#}", e);
        }
    }

    /// Startup check: reports whether to greet, and marks the visit if so.
    pub fn check_and_mark(&self) -> bool {
        let first = self.should_show_welcome();
        if first {
            self.mark_visited();
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::ReadOnlyStore;
    use crate::storage::SqliteStore;

    #[test]
    fn test_fresh_store_shows_welcome_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gate = FirstVisitGate::new(&store);
        assert!(gate.should_show_welcome());
        gate.mark_visited();

        // next session, same storage
        let gate = FirstVisitGate::new(&store);
        assert!(!gate.should_show_welcome());
        assert_eq!(store.get(VISITED_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_check_and_mark() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(FirstVisitGate::new(&store).check_and_mark());
        assert!(!FirstVisitGate::new(&store).check_and_mark());
        assert!(!FirstVisitGate::new(&store).check_and_mark());
    }

    #[test]
    fn test_any_stored_value_counts_as_visited() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set(VISITED_KEY, "yes").unwrap();
        assert!(!FirstVisitGate::new(&store).should_show_welcome());
    }

    #[test]
    fn test_failed_write_is_swallowed() {
        let store = ReadOnlyStore::default();
        let gate = FirstVisitGate::new(&store);
        assert!(gate.check_and_mark());
        // nothing was written, so the flag is still absent
        assert!(gate.should_show_welcome());
    }
}
