// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use ahash::AHashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Counted<V> {
    ref_count: u32,
    value: V,
}

/// Outcome of [`RefCountedTable::release`].
#[derive(Debug, PartialEq, Eq)]
pub enum Release<V> {
    /// The entry is still referenced; carries the remaining count.
    Retained(u32),
    /// The count reached zero and the entry was removed.
    Removed(V),
}

/// A map whose entries live exactly as long as their reference count is
/// above zero.
#[derive(Debug)]
pub struct RefCountedTable<K, V> {
    entries: AHashMap<K, Counted<V>>,
}

impl<K: Eq + Hash + Copy, V> RefCountedTable<K, V> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Increments the count of an existing entry and returns the entry with
    /// its new count. Returns `None` if the key is not active.
    pub fn acquire(&mut self, key: &K) -> Option<(&V, u32)> {
        let entry = self.entries.get_mut(key)?;
        entry.ref_count += 1;
        Some((&entry.value, entry.ref_count))
    }

    /// Registers a new entry with a count of one.
    ///
    /// An entry already present under `key` is replaced; callers check with
    /// [`RefCountedTable::acquire`] first.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            Counted {
                ref_count: 1,
                value,
            },
        );
    }

    /// Decrements the count of an entry, removing it at zero.
    /// Returns `None` if the key is not active.
    pub fn release(&mut self, key: &K) -> Option<Release<V>> {
        let entry = self.entries.get_mut(key)?;
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Some(Release::Retained(entry.ref_count));
        }
        self.entries.remove(key).map(|entry| Release::Removed(entry.value))
    }

    /// Returns an entry without touching its count.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Current count of an entry, zero if it is not active.
    pub fn ref_count(&self, key: &K) -> u32 {
        self.entries.get(key).map_or(0, |entry| entry.ref_count)
    }

    /// Whether the key is active.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of active entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, entry, count)`.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V, u32)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key, &entry.value, entry.ref_count))
    }

    /// Removes every entry regardless of its count.
    pub fn drain(&mut self) -> impl Iterator<Item = (K, V, u32)> + '_ {
        self.entries
            .drain()
            .map(|(key, entry)| (key, entry.value, entry.ref_count))
    }

    /// Removes every entry regardless of its count.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash + Copy, V> Default for RefCountedTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_lives_while_referenced() {
        let mut table = RefCountedTable::new();
        table.insert(1u32, "one");
        assert_eq!(table.acquire(&1), Some((&"one", 2)));

        assert_eq!(table.release(&1), Some(Release::Retained(1)));
        assert!(table.contains(&1));

        assert_eq!(table.release(&1), Some(Release::Removed("one")));
        assert!(!table.contains(&1));
        assert_eq!(table.ref_count(&1), 0);
    }

    #[test]
    fn test_unknown_keys() {
        let mut table: RefCountedTable<u32, ()> = RefCountedTable::new();
        assert!(table.acquire(&7).is_none());
        assert!(table.release(&7).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_drain_empties_the_table() {
        let mut table = RefCountedTable::new();
        table.insert(1u32, 'a');
        table.insert(2u32, 'b');
        table.acquire(&2);

        let mut drained: Vec<_> = table.drain().collect();
        drained.sort();
        assert_eq!(drained, vec![(1, 'a', 1), (2, 'b', 2)]);
        assert!(table.is_empty());
    }
}
