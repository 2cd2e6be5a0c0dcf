//! Sorted, unique-by-name list of directory entries.

use crate::error::{DirError, Result};
use crate::sorting::Comparator;
use std::fs::Metadata;
use std::time::SystemTime;

/// Direction for neighbor lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// One item of the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File name relative to the directory; unique within a store.
    pub name: String,
    pub size: u64,
    pub modify_time: SystemTime,
    pub is_directory: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>, size: u64, modify_time: SystemTime) -> Self {
        Self {
            name: name.into(),
            size,
            modify_time,
            is_directory: false,
        }
    }

    pub fn from_metadata(name: String, metadata: &Metadata) -> std::io::Result<Self> {
        Ok(Self {
            name,
            size: metadata.len(),
            modify_time: metadata.modified()?,
            is_directory: metadata.is_dir(),
        })
    }
}

/// Entries of one directory, kept sorted under the comparator the caller passes in.
///
/// The store does not remember the comparator: whoever owns it must use the same
/// one for every `insert_sorted` until the next `sort_all`.
#[derive(Debug, Default, Clone)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Linear lookup by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Mutable access for in-place field updates.
    ///
    /// Changing a field the current comparator orders by breaks the sort; remove and
    /// re-insert instead.
    pub fn get_mut_by_name(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn first(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Inserts after every element that does not compare greater than `entry`.
    ///
    /// Returns the insertion index, or `NameCollision` without touching the store.
    pub fn insert_sorted(&mut self, entry: Entry, comparator: &Comparator) -> Result<usize> {
        if self.contains(&entry.name) {
            return Err(DirError::NameCollision(entry.name));
        }
        let index = self
            .entries
            .partition_point(|e| comparator.compare(&entry, e).is_ge());
        self.entries.insert(index, entry);
        Ok(index)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Entry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Removes the named entry and returns it with the index it occupied.
    pub fn remove_by_name(&mut self, name: &str) -> Option<(usize, Entry)> {
        let index = self.index_of(name)?;
        Some((index, self.entries.remove(index)))
    }

    /// The entry right before or after `name`, if any.
    pub fn neighbor_of(&self, name: &str, direction: Direction) -> Option<&Entry> {
        let index = self.index_of(name)?;
        match direction {
            Direction::Next => self.entries.get(index + 1),
            Direction::Previous => index.checked_sub(1).and_then(|i| self.entries.get(i)),
        }
    }

    /// Stable in-place sort.
    pub fn sort_all(&mut self, comparator: &Comparator) {
        self.entries.sort_by(|a, b| comparator.compare(a, b));
    }

    /// Swaps in a freshly scanned list, keeping only the first of any duplicate names.
    pub fn replace_all(&mut self, entries: Vec<Entry>, comparator: &Comparator) {
        let mut seen = std::collections::HashSet::with_capacity(entries.len());
        self.entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.name.clone()))
            .collect();
        self.sort_all(comparator);
    }

    pub fn is_sorted_by(&self, comparator: &Comparator) -> bool {
        self.entries
            .windows(2)
            .all(|pair| comparator.compare(&pair[0], &pair[1]).is_le())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::SortingMode;
    use std::time::Duration;

    fn entry(name: &str, size: u64, secs: u64) -> Entry {
        Entry::new(name, size, SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn store_of(names: &[&str]) -> EntryStore {
        let mut store = EntryStore::new();
        let cmp = SortingMode::Name.comparator();
        for name in names {
            store.insert_sorted(entry(name, 0, 0), &cmp).unwrap();
        }
        store
    }

    #[test]
    fn insert_keeps_numeric_name_order() {
        let mut store = store_of(&["a10.jpg", "a2.jpg"]);
        assert_eq!(store.names(), vec!["a2.jpg", "a10.jpg"]);

        let index = store
            .insert_sorted(entry("a1.jpg", 0, 0), &SortingMode::Name.comparator())
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(store.names(), vec!["a1.jpg", "a2.jpg", "a10.jpg"]);
    }

    #[test]
    fn duplicate_insert_is_rejected_without_change() {
        let mut store = store_of(&["a.jpg", "b.jpg"]);
        let result = store.insert_sorted(entry("a.jpg", 99, 99), &SortingMode::Size.comparator());
        assert!(matches!(result, Err(DirError::NameCollision(name)) if name == "a.jpg"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_name("a.jpg").unwrap().size, 0);
    }

    #[test]
    fn equal_sizes_insert_in_name_order() {
        let cmp = SortingMode::Size.comparator();
        let mut store = EntryStore::new();
        store.insert_sorted(entry("b.jpg", 5, 0), &cmp).unwrap();
        store.insert_sorted(entry("big.jpg", 9, 0), &cmp).unwrap();
        store.insert_sorted(entry("c.jpg", 5, 0), &cmp).unwrap();
        let index = store.insert_sorted(entry("a.jpg", 5, 0), &cmp).unwrap();
        assert_eq!(index, 0);
        assert_eq!(store.names(), vec!["a.jpg", "b.jpg", "c.jpg", "big.jpg"]);
        assert!(store.is_sorted_by(&cmp));
    }

    #[test]
    fn remove_returns_entry_and_index() {
        let mut store = store_of(&["a.jpg", "b.jpg", "c.jpg"]);
        let (index, removed) = store.remove_by_name("b.jpg").unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.name, "b.jpg");
        assert!(store.remove_by_name("b.jpg").is_none());
        assert!(store.remove_at(5).is_none());
        assert_eq!(store.remove_at(0).unwrap().name, "a.jpg");
        assert_eq!(store.names(), vec!["c.jpg"]);
    }

    #[test]
    fn boundaries() {
        let store = store_of(&["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(store.first().unwrap().name, "a.jpg");
        assert_eq!(store.last().unwrap().name, "c.jpg");
        assert!(store.neighbor_of("a.jpg", Direction::Previous).is_none());
        assert!(store.neighbor_of("c.jpg", Direction::Next).is_none());
        assert_eq!(
            store.neighbor_of("b.jpg", Direction::Next).unwrap().name,
            "c.jpg"
        );
        assert_eq!(
            store.neighbor_of("b.jpg", Direction::Previous).unwrap().name,
            "a.jpg"
        );
        assert!(store.neighbor_of("zzz.jpg", Direction::Next).is_none());
        assert!(store.index_of("zzz.jpg").is_none());

        let empty = EntryStore::new();
        assert!(empty.first().is_none());
        assert!(empty.last().is_none());
    }

    #[test]
    fn sort_all_reorders_by_mode() {
        let mut store = EntryStore::new();
        store.replace_all(
            vec![
                entry("c.jpg", 1, 30),
                entry("a.jpg", 2, 10),
                entry("b.jpg", 1, 20),
            ],
            &SortingMode::Name.comparator(),
        );
        assert_eq!(store.names(), vec!["a.jpg", "b.jpg", "c.jpg"]);

        let by_size = SortingMode::Size.comparator();
        store.sort_all(&by_size);
        assert_eq!(store.names(), vec!["b.jpg", "c.jpg", "a.jpg"]);
        assert!(store.is_sorted_by(&by_size));

        let by_time_desc = SortingMode::TimeDesc.comparator();
        store.sort_all(&by_time_desc);
        assert_eq!(store.names(), vec!["c.jpg", "b.jpg", "a.jpg"]);
    }

    #[test]
    fn replace_all_drops_duplicate_names() {
        let mut store = EntryStore::new();
        store.replace_all(
            vec![entry("a.jpg", 1, 0), entry("a.jpg", 2, 0)],
            &SortingMode::Name.comparator(),
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.first().unwrap().size, 1);
    }
}
