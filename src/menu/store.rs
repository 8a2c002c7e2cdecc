//! # Item Store
//!
//! Insertion-ordered rows with an identity index. Updates for a known
//! identity replace the row in place, unknown identities append, and rows
//! without fields delete their identity while keeping the relative order of
//! everything that survives.

use super::row::Row;
use std::collections::HashMap;

/// What an [`ItemStore::upsert`] did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A new identity was appended at this position.
    Inserted(usize),
    /// An existing identity was replaced at this position.
    Replaced(usize),
    /// The identity at this position was removed.
    Removed(usize),
    /// A removal for an identity the store never held.
    Ignored,
}

/// Ordered, identity-deduplicated collection of rows.
#[derive(Debug)]
pub struct ItemStore<R> {
    items: Vec<R>,
    positions: HashMap<String, usize>,
}

impl<R> Default for ItemStore<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<R: Row> ItemStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one update into the store.
    pub fn upsert(&mut self, row: R) -> Change {
        if row.is_removed() {
            return self.remove(row.identity());
        }

        if let Some(&pos) = self.positions.get(row.identity()) {
            self.items[pos] = row;
            return Change::Replaced(pos);
        }

        let pos = self.items.len();
        self.positions.insert(row.identity().to_string(), pos);
        self.items.push(row);
        Change::Inserted(pos)
    }

    fn remove(&mut self, identity: &str) -> Change {
        let Some(pos) = self.positions.remove(identity) else {
            return Change::Ignored;
        };

        self.items.remove(pos);
        for row in &self.items[pos..] {
            if let Some(p) = self.positions.get_mut(row.identity()) {
                *p -= 1;
            }
        }
        Change::Removed(pos)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.items.get(index)
    }

    /// The rows in `offset..offset + count`, cut short at the end of the store.
    pub fn window(&self, offset: usize, count: usize) -> &[R] {
        let start = offset.min(self.items.len());
        let end = offset.saturating_add(count).min(self.items.len());
        &self.items[start..end]
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::row::testing::TestRow;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ids(store: &ItemStore<TestRow>) -> Vec<&str> {
        store.iter().map(|r| r.identity()).collect()
    }

    fn assert_index_consistent(store: &ItemStore<TestRow>) {
        assert_eq!(store.positions.len(), store.len());
        for (i, row) in store.iter().enumerate() {
            assert_eq!(store.positions.get(row.identity()).copied(), Some(i));
        }
    }

    #[test]
    fn test_new_identities_append_in_arrival_order() {
        let mut store = ItemStore::new();
        assert_eq!(store.upsert(TestRow::new("a", &["1"])), Change::Inserted(0));
        assert_eq!(store.upsert(TestRow::new("b", &["2"])), Change::Inserted(1));
        assert_eq!(store.upsert(TestRow::new("c", &["3"])), Change::Inserted(2));
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn test_upsert_same_identity_keeps_position_with_latest_fields() {
        let mut store = ItemStore::new();
        store.upsert(TestRow::new("a", &["old"]));
        store.upsert(TestRow::new("b", &["x"]));
        assert_eq!(store.upsert(TestRow::new("a", &["new"])), Change::Replaced(0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), Some(&TestRow::new("a", &["new"])));
        assert_index_consistent(&store);
    }

    #[test]
    fn test_removal_shifts_later_rows_down_by_one() {
        let mut store = ItemStore::new();
        for id in ["a", "b", "c", "d", "e"] {
            store.upsert(TestRow::new(id, &[id]));
        }

        assert_eq!(store.upsert(TestRow::removed("b")), Change::Removed(1));
        assert_eq!(ids(&store), vec!["a", "c", "d", "e"]);
        assert_eq!(store.positions.get("c").copied(), Some(1));
        assert_eq!(store.positions.get("e").copied(), Some(3));
        assert_eq!(store.positions.get("b").copied(), None);
        assert_index_consistent(&store);
    }

    #[test]
    fn test_readded_identity_goes_to_the_end() {
        let mut store = ItemStore::new();
        for id in ["a", "b", "c"] {
            store.upsert(TestRow::new(id, &[id]));
        }
        store.upsert(TestRow::removed("a"));
        assert_eq!(store.upsert(TestRow::new("a", &["again"])), Change::Inserted(2));
        assert_eq!(ids(&store), vec!["b", "c", "a"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn test_removing_unknown_identity_is_ignored() {
        let mut store: ItemStore<TestRow> = ItemStore::new();
        store.upsert(TestRow::new("a", &["1"]));
        assert_eq!(store.upsert(TestRow::removed("zzz")), Change::Ignored);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_interleaved_updates_collapse_to_latest() {
        let mut store = ItemStore::new();
        store.upsert(TestRow::new("A", &["x"]));
        store.upsert(TestRow::new("B", &["y"]));
        store.upsert(TestRow::new("A", &["z"]));
        store.upsert(TestRow::removed("B"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0), Some(&TestRow::new("A", &["z"])));
        assert_index_consistent(&store);
    }

    #[test]
    fn test_window_is_cut_at_end() {
        let mut store = ItemStore::new();
        for id in ["a", "b", "c"] {
            store.upsert(TestRow::new(id, &[id]));
        }
        assert_eq!(store.window(1, 10).len(), 2);
        assert_eq!(store.window(3, 2).len(), 0);
        assert_eq!(store.window(7, 2).len(), 0);
        assert_eq!(store.window(0, 2)[1].identity(), "b");
    }

    /// Counts how often its fields are built.
    struct CountingRow {
        id: &'static str,
        removed: bool,
        built: Rc<Cell<u32>>,
    }

    impl Row for CountingRow {
        fn identity(&self) -> &str {
            self.id
        }

        fn fields(&self) -> Option<Vec<String>> {
            self.built.set(self.built.get() + 1);
            (!self.removed).then(|| vec![self.id.to_string()])
        }

        fn is_removed(&self) -> bool {
            self.removed
        }
    }

    #[test]
    fn test_upsert_does_not_build_fields() {
        let built = Rc::new(Cell::new(0));
        let row = |id, removed| CountingRow {
            id,
            removed,
            built: built.clone(),
        };
        let mut store = ItemStore::new();
        assert_eq!(store.upsert(row("a", false)), Change::Inserted(0));
        assert_eq!(store.upsert(row("a", false)), Change::Replaced(0));
        assert_eq!(store.upsert(row("a", true)), Change::Removed(0));
        assert_eq!(built.get(), 0);
    }
}
