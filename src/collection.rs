//! # Name-keyed ordered collection
//!
//! [`NamedCollection`] stores values in insertion order and indexes them by name. It backs the
//! node set of a context, the baselines of a [`crate::baselines::BaselineCollection`], the
//! models of a [`crate::context::Context`] and the [`crate::context::ContextRegistry`].
//!
//! Removal leaves a tombstone in place so that the positions of the remaining items do not
//! move while callers hold slot indices. Tombstones are reclaimed by an explicit
//! [`NamedCollection::compact`] pass.

use std::collections::HashMap;

use ahash::RandomState;

use crate::vlbi_errors::VlbiError;

/// Anything stored in a [`NamedCollection`] must expose a stable name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct NamedCollection<T> {
    slots: Vec<Option<T>>,
    index: HashMap<String, usize, RandomState>,
}

impl<T> Default for NamedCollection<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<T: Named> NamedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the end of the collection.
    ///
    /// Return
    /// ------
    /// * the slot index of the new item, or [`VlbiError::DuplicateName`] if an item with the
    ///   same name is already present (the collection is left untouched)
    pub fn add(&mut self, item: T) -> Result<usize, VlbiError> {
        let name = item.name().to_string();
        if self.index.contains_key(&name) {
            return Err(VlbiError::DuplicateName(name));
        }
        let slot = self.slots.len();
        self.slots.push(Some(item));
        self.index.insert(name, slot);
        Ok(slot)
    }

    /// Remove an item by name, leaving a tombstone. Unknown names are a no-op.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let slot = self.index.remove(name)?;
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index
            .get(name)
            .and_then(|&slot| self.slots.get(slot))
            .and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let slot = *self.index.get(name)?;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Item at `position` among the live items, in insertion order.
    pub fn at(&self, position: usize) -> Option<&T> {
        self.iter().nth(position)
    }

    /// Position of `name` among the live items, in insertion order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.iter().position(|item| item.name() == name)
    }

    /// Raw slot of `name`. Slots are stable until the next [`Self::compact`].
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Item stored in a raw slot, `None` for tombstones and out-of-range slots.
    pub fn at_slot(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots currently holding a tombstone.
    pub fn tombstones(&self) -> usize {
        self.slots.len() - self.index.len()
    }

    /// Coalesce the tombstones left by [`Self::remove`].
    ///
    /// The relative order of the live items is preserved; their slot indices change.
    pub fn compact(&mut self) {
        if self.tombstones() == 0 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (slot, item) in self.slots.iter().enumerate() {
            if let Some(item) = item {
                self.index.insert(item.name().to_string(), slot);
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flatten()
    }

    /// Live items with their raw slot index.
    pub fn iter_slots(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (slot, item)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(Named::name)
    }
}

#[cfg(test)]
mod collection_test {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(String, i32);

    impl Named for Item {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn item(name: &str, value: i32) -> Item {
        Item(name.to_string(), value)
    }

    #[test]
    fn test_add_and_lookup() {
        let mut coll = NamedCollection::new();
        assert_eq!(coll.add(item("a", 1)), Ok(0));
        assert_eq!(coll.add(item("b", 2)), Ok(1));

        assert_eq!(coll.get("b"), Some(&item("b", 2)));
        assert_eq!(coll.at(0), Some(&item("a", 1)));
        assert_eq!(coll.position("b"), Some(1));
        assert_eq!(coll.get("c"), None);
        assert_eq!(coll.at(2), None);
        assert_eq!(coll.len(), 2);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut coll = NamedCollection::new();
        coll.add(item("a", 1)).unwrap();
        assert_eq!(
            coll.add(item("a", 5)),
            Err(VlbiError::DuplicateName("a".into()))
        );
        assert_eq!(coll.len(), 1);
        assert_eq!(coll.get("a").unwrap().1, 1);
    }

    #[test]
    fn test_remove_leaves_tombstone_until_compaction() {
        let mut coll = NamedCollection::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            coll.add(item(name, i as i32)).unwrap();
        }

        assert_eq!(coll.remove("b"), Some(item("b", 1)));
        assert_eq!(coll.remove("b"), None);
        assert_eq!(coll.remove("zz"), None);

        assert_eq!(coll.len(), 3);
        assert_eq!(coll.tombstones(), 1);
        assert_eq!(coll.slot("c"), Some(2));
        assert_eq!(coll.at(1), Some(&item("c", 2)));
        assert_eq!(coll.at_slot(1), None);

        coll.compact();
        assert_eq!(coll.tombstones(), 0);
        assert_eq!(coll.slot("c"), Some(1));
        assert_eq!(coll.names().collect::<Vec<_>>(), vec!["a", "c", "d"]);

        // a removed name can be reused
        assert_eq!(coll.add(item("b", 9)), Ok(3));
        assert_eq!(coll.names().last(), Some("b"));
    }

    #[test]
    fn test_iter_mut_skips_tombstones() {
        let mut coll = NamedCollection::new();
        coll.add(item("a", 1)).unwrap();
        coll.add(item("b", 2)).unwrap();
        coll.add(item("c", 3)).unwrap();
        coll.remove("a");

        for it in coll.iter_mut() {
            it.1 *= 10;
        }
        let values: Vec<i32> = coll.iter().map(|it| it.1).collect();
        assert_eq!(values, vec![20, 30]);

        let slots: Vec<usize> = coll.iter_slots().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![1, 2]);
    }
}
