//! Ordered set façade.

use std::borrow::Borrow;
use std::fmt;

use keel_buffer::{Full, DYNAMIC, FIXED};

use crate::ordered_map::OrderedMap;

/// A sorted set: an [`OrderedMap`] with unit values.
///
/// # Example
///
/// ```
/// use keel_collections::DynamicOrderedSet;
///
/// let mut set: DynamicOrderedSet<u32> = DynamicOrderedSet::with_capacity(8);
/// for key in [5, 2, 8] {
///     set.insert(key).unwrap();
/// }
/// let sorted: Vec<u32> = set.iter().copied().collect();
/// assert_eq!(sorted, [2, 5, 8]);
/// ```
pub struct OrderedSet<K, const MODE: bool> {
    map: OrderedMap<K, (), MODE>,
}

/// Type alias for a fixed-capacity ordered set.
pub type FixedOrderedSet<K> = OrderedSet<K, FIXED>;

/// Type alias for an expanding ordered set.
pub type DynamicOrderedSet<K> = OrderedSet<K, DYNAMIC>;

impl<K, const MODE: bool> OrderedSet<K, MODE> {
    /// Creates a set with room for `capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or does not fit the `u32` index range.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: OrderedMap::with_capacity(capacity),
        }
    }

    /// Returns the number of keys.
    #[inline]
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set holds no keys.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the current capacity in keys.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Returns the smallest key.
    pub fn first(&self) -> Option<&K> {
        self.map.first().map(|(k, _)| k)
    }

    /// Returns the largest key.
    pub fn last(&self) -> Option<&K> {
        self.map.last().map(|(k, _)| k)
    }

    /// Drops every key. Idempotent; capacity is kept.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// Inserts `key`. Returns `true` if it was not already present.
    ///
    /// A fixed set that is out of slots hands the key back in
    /// `Err(Full)`.
    pub fn insert(&mut self, key: K) -> Result<bool, Full<K>>
    where
        K: Ord,
    {
        match self.map.insert(key, ()) {
            Ok(old) => Ok(old.is_none()),
            Err(full) => Err(Full(full.into_inner().0)),
        }
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns the stored key equal to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get_key_value(key).map(|(k, _)| k)
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Removes and returns the stored key equal to `key`.
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove_entry(key).map(|(k, ())| k)
    }
}

impl<K: fmt::Debug, const MODE: bool> fmt::Debug for OrderedSet<K, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut set: DynamicOrderedSet<u32> = DynamicOrderedSet::with_capacity(8);
        assert!(set.insert(1).unwrap());
        assert!(!set.insert(1).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn iteration_is_sorted() {
        let mut set: DynamicOrderedSet<u32> = DynamicOrderedSet::with_capacity(4);
        for key in [31, 4, 15, 9, 26] {
            set.insert(key).unwrap();
        }
        let sorted: Vec<u32> = set.iter().copied().collect();
        assert_eq!(sorted, [4, 9, 15, 26, 31]);
        assert_eq!(set.first(), Some(&4));
        assert_eq!(set.last(), Some(&31));
    }

    #[test]
    fn contains_remove_take() {
        let mut set: DynamicOrderedSet<String> = DynamicOrderedSet::with_capacity(4);
        set.insert("a".to_string()).unwrap();
        set.insert("b".to_string()).unwrap();

        assert!(set.contains("a"));
        assert_eq!(set.get("b"), Some(&"b".to_string()));
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
        assert_eq!(set.take("b"), Some("b".to_string()));
        assert!(set.is_empty());
    }

    #[test]
    fn fixed_full_returns_key() {
        let mut set: FixedOrderedSet<u32> = FixedOrderedSet::with_capacity(3);
        for key in 0..3 {
            set.insert(key).unwrap();
        }
        let err = set.insert(9).unwrap_err();
        assert_eq!(err.into_inner(), 9);
        assert!(!set.insert(1).unwrap());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut set: DynamicOrderedSet<u32> = DynamicOrderedSet::with_capacity(8);
        for key in 0..5 {
            set.insert(key).unwrap();
        }
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.first(), None);
        set.clear();
        assert!(set.is_empty());
    }
}
