//! In-memory local store for testing.

use crate::error::StoreResult;
use crate::record::RecordTable;
use crate::store::LocalStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A local store that keeps every table in memory.
///
/// This store is suitable for:
/// - Unit tests
/// - Integration tests
/// - Simulated remotes (see the engine's `SimulatedRemote`)
///
/// # Thread Safety
///
/// All tables sit behind one `RwLock`; a write block holds the write lock for
/// its whole duration.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<&'static str, RecordTable>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all tables that have been written.
    #[must_use]
    pub fn entity_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tables.read().keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Removes every table.
    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

impl LocalStore for InMemoryStore {
    fn read_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&RecordTable) -> R,
    ) -> StoreResult<R> {
        let tables = self.tables.read();
        match tables.get(entity) {
            Some(table) => Ok(f(table)),
            None => Ok(f(&RecordTable::new())),
        }
    }

    fn write_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&mut RecordTable) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut tables = self.tables.write();
        f(tables.entry(entity).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use driftsync_model::{
        CopyableWithNewId, HasIdentity, HasTombstone, HasUpdateTimestamp, Metadata, SyncEntity,
        Timestamp,
    };
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use std::cell::Cell;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Memo {
        id: String,
        last_updated: Timestamp,
        deleted: bool,
        text: String,
    }

    impl HasIdentity for Memo {
        fn id(&self) -> &str {
            &self.id
        }
    }

    impl HasUpdateTimestamp for Memo {
        fn last_updated(&self) -> Timestamp {
            self.last_updated
        }

        fn set_last_updated(&mut self, at: Timestamp) {
            self.last_updated = at;
        }
    }

    impl HasTombstone for Memo {
        fn is_deleted(&self) -> bool {
            self.deleted
        }

        fn set_deleted(&mut self, deleted: bool) {
            self.deleted = deleted;
        }
    }

    impl CopyableWithNewId for Memo {
        fn copy_with_new_id(&self, id: String) -> Self {
            Self {
                id,
                ..self.clone()
            }
        }
    }

    impl SyncEntity for Memo {
        const ENTITY_NAME: &'static str = "memos";
    }

    fn memo(id: &str, ts: i64) -> Memo {
        Memo {
            id: id.into(),
            last_updated: Timestamp::from_millis(ts),
            deleted: false,
            text: format!("memo {id}"),
        }
    }

    #[test]
    fn save_and_get() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();

        assert_eq!(store.get::<Memo>("a").unwrap(), Some(memo("a", 1)));
        assert_eq!(store.get::<Memo>("missing").unwrap(), None);
        assert_eq!(store.count::<Memo>().unwrap(), 1);
        assert_eq!(store.entity_names(), vec!["memos"]);
    }

    #[test]
    fn save_replaces_existing() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();
        store.save(&memo("a", 9)).unwrap();

        assert_eq!(store.get_metadata::<Memo>().unwrap(), vec![Metadata::new("a", 9)]);
    }

    #[test]
    fn empty_table_reads_as_empty() {
        let store = InMemoryStore::new();
        assert!(store.get_all::<Memo>().unwrap().is_empty());
        assert!(store.get_metadata::<Memo>().unwrap().is_empty());
    }

    #[test]
    fn logical_delete_keeps_tombstone() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();
        store.delete::<Memo>("a").unwrap();

        let stored = store.get::<Memo>("a").unwrap().unwrap();
        assert!(stored.deleted);
        assert!(stored.last_updated > Timestamp::from_millis(1));
        assert!(store.get_metadata::<Memo>().unwrap()[0].deleted);
    }

    #[test]
    fn logical_delete_outdates_future_stamp() {
        let store = InMemoryStore::new();
        let far_future = Timestamp::now().as_millis() + 60_000;
        store.save(&memo("a", far_future)).unwrap();
        store.delete::<Memo>("a").unwrap();

        let stored = store.get::<Memo>("a").unwrap().unwrap();
        assert_eq!(stored.last_updated, Timestamp::from_millis(far_future + 1));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.delete::<Memo>("nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "memos", .. }));
    }

    #[test]
    fn stamp_updated_rewrites_timestamp() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();
        store
            .stamp_updated::<Memo>("a", Timestamp::from_millis(50))
            .unwrap();

        assert_eq!(store.get_metadata::<Memo>().unwrap(), vec![Metadata::new("a", 50)]);
        assert_eq!(store.get::<Memo>("a").unwrap().unwrap().text, "memo a");
    }

    #[test]
    fn stamp_updated_if_skips_rewritten_record() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();
        store
            .save(&Memo {
                text: "edited".into(),
                ..memo("a", 7)
            })
            .unwrap();

        let stamped = store
            .stamp_updated_if::<Memo>("a", Timestamp::from_millis(1), Timestamp::from_millis(50))
            .unwrap();

        assert!(!stamped);
        let kept = store.get::<Memo>("a").unwrap().unwrap();
        assert_eq!(kept.last_updated, Timestamp::from_millis(7));
        assert_eq!(kept.text, "edited");
    }

    #[test]
    fn stamp_updated_if_stamps_unchanged_record() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();

        assert!(store
            .stamp_updated_if::<Memo>("a", Timestamp::from_millis(1), Timestamp::from_millis(50))
            .unwrap());
        assert!(!store
            .stamp_updated_if::<Memo>("gone", Timestamp::from_millis(1), Timestamp::from_millis(50))
            .unwrap());
        assert_eq!(store.get_metadata::<Memo>().unwrap(), vec![Metadata::new("a", 50)]);
    }

    #[test]
    fn purge_removes_record() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();

        assert!(store.purge::<Memo>("a").unwrap());
        assert!(!store.purge::<Memo>("a").unwrap());
        assert_eq!(store.count::<Memo>().unwrap(), 0);
    }

    #[test]
    fn delete_where_removes_matches() {
        let store = InMemoryStore::new();
        for (id, ts) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            store.save(&memo(id, ts)).unwrap();
        }

        let removed = store
            .delete_where::<Memo, _, _>(|m| m.last_updated.as_millis() < 3, || false)
            .unwrap();

        assert_eq!(removed, 2);
        let remaining: Vec<_> = store
            .get_all::<Memo>()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(remaining, vec!["c", "d"]);
    }

    #[test]
    fn delete_where_stops_when_cancelled() {
        let store = InMemoryStore::new();
        for id in ["a", "b", "c", "d"] {
            store.save(&memo(id, 1)).unwrap();
        }

        let checks = Cell::new(0);
        let removed = store
            .delete_where::<Memo, _, _>(
                |_| true,
                || {
                    checks.set(checks.get() + 1);
                    // First call is the pre-sweep check.
                    checks.get() > 2
                },
            )
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.count::<Memo>().unwrap(), 2);
    }

    #[test]
    fn delete_where_cancelled_up_front_removes_nothing() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();

        let removed = store.delete_where::<Memo, _, _>(|_| true, || true).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.count::<Memo>().unwrap(), 1);
    }

    #[test]
    fn clear_drops_tables() {
        let store = InMemoryStore::new();
        store.save(&memo("a", 1)).unwrap();
        store.clear();
        assert!(store.entity_names().is_empty());
    }

    proptest! {
        #[test]
        fn metadata_tracks_last_save(writes in proptest::collection::vec(("[a-c]", 0i64..100), 0..20)) {
            let store = InMemoryStore::new();
            let mut expected = BTreeMap::new();
            for (id, ts) in &writes {
                store.save(&memo(id, *ts)).unwrap();
                expected.insert(id.clone(), *ts);
            }

            let actual: Vec<(String, i64)> = store
                .get_metadata::<Memo>()
                .unwrap()
                .into_iter()
                .map(|m| (m.id, m.last_updated.as_millis()))
                .collect();
            prop_assert_eq!(actual, expected.into_iter().collect::<Vec<_>>());
        }
    }
}
