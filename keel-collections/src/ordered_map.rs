//! Ordered map façade over the AVL engine.

use std::borrow::Borrow;
use std::fmt;

use keel_buffer::{Full, DYNAMIC, FIXED};

use crate::tree::{self, AvlTree};

/// A sorted map over manually allocated storage.
///
/// Keys are kept in a balanced tree, so lookups and mutations are
/// O(log n) and iteration yields keys in ascending order. `MODE`
/// selects fixed or expanding capacity exactly as in the rest of the
/// workspace.
///
/// # Example
///
/// ```
/// use keel_collections::DynamicOrderedMap;
///
/// let mut map: DynamicOrderedMap<u32, &str> = DynamicOrderedMap::with_capacity(8);
/// map.insert(3, "three").unwrap();
/// map.insert(1, "one").unwrap();
/// map.insert(2, "two").unwrap();
///
/// let keys: Vec<u32> = map.keys().copied().collect();
/// assert_eq!(keys, [1, 2, 3]);
/// assert_eq!(map.first(), Some((&1, &"one")));
/// ```
pub struct OrderedMap<K, V, const MODE: bool> {
    tree: AvlTree<K, V, MODE>,
}

/// Type alias for a fixed-capacity ordered map.
pub type FixedOrderedMap<K, V> = OrderedMap<K, V, FIXED>;

/// Type alias for an expanding ordered map.
pub type DynamicOrderedMap<K, V> = OrderedMap<K, V, DYNAMIC>;

impl<K, V, const MODE: bool> OrderedMap<K, V, MODE> {
    /// Creates a map with room for `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or does not fit the `u32` index range.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: AvlTree::with_capacity(capacity),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the current capacity in entries.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    /// Returns the smallest key and its value.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first()
    }

    /// Returns the largest key and its value.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last()
    }

    /// Drops every entry. Idempotent; capacity is kept.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries in ascending key order.
    pub fn iter(&self) -> tree::Iter<'_, K, V> {
        self.tree.iter()
    }

    /// Returns an in-order iterator with mutable values.
    pub fn iter_mut(&mut self) -> tree::IterMut<'_, K, V> {
        self.tree.iter_mut()
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.tree.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over the values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.tree.iter().map(|(_, v)| v)
    }

    /// Returns an iterator over mutable values in ascending key order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.tree.iter_mut().map(|(_, v)| v)
    }

    /// Inserts a key/value pair, returning the previous value for the
    /// key if there was one.
    ///
    /// A fixed map that is out of slots hands the pair back in
    /// `Err(Full)`.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Full<(K, V)>>
    where
        K: Ord,
    {
        self.tree.insert(key, value)
    }

    /// Returns a reference to the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key)
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get_mut(key)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, const MODE: bool> fmt::Debug for OrderedMap<K, V, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut map: DynamicOrderedMap<u32, &str> = DynamicOrderedMap::with_capacity(8);
        assert_eq!(map.insert(2, "two").unwrap(), None);
        assert_eq!(map.insert(1, "one").unwrap(), None);
        assert_eq!(map.insert(2, "TWO").unwrap(), Some("two"));

        assert_eq!(map.get(&2), Some(&"TWO"));
        assert!(map.contains_key(&1));
        assert_eq!(map.remove(&1), Some("one"));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn iteration_is_sorted() {
        let mut map: DynamicOrderedMap<u32, u32> = DynamicOrderedMap::with_capacity(4);
        for key in [9, 1, 7, 3, 5] {
            map.insert(key, key * 10).unwrap();
        }
        let pairs: Vec<(u32, u32)> = map.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(pairs, [(1, 10), (3, 30), (5, 50), (7, 70), (9, 90)]);
        assert_eq!(map.first(), Some((&1, &10)));
        assert_eq!(map.last(), Some((&9, &90)));
    }

    #[test]
    fn borrowed_key_lookup() {
        let mut map: DynamicOrderedMap<String, u32> = DynamicOrderedMap::with_capacity(4);
        map.insert("hello".to_string(), 5).unwrap();

        assert_eq!(map.get("hello"), Some(&5));
        assert_eq!(map.get_key_value("hello"), Some((&"hello".to_string(), &5)));
        assert_eq!(map.remove_entry("hello"), Some(("hello".to_string(), 5)));
        assert!(map.is_empty());
    }

    #[test]
    fn values_mut_walks_in_key_order() {
        let mut map: DynamicOrderedMap<u32, u32> = DynamicOrderedMap::with_capacity(4);
        for key in [2, 0, 1] {
            map.insert(key, 0).unwrap();
        }
        let mut next = 0;
        for value in map.values_mut() {
            *value = next;
            next += 1;
        }
        // Ascending key order, so key i received value i.
        for key in 0..3 {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    #[test]
    fn fixed_map_full_returns_pair() {
        let mut map: FixedOrderedMap<u32, u32> = FixedOrderedMap::with_capacity(3);
        for key in 0..3 {
            map.insert(key, key).unwrap();
        }
        let err = map.insert(9, 9).unwrap_err();
        assert_eq!(err.into_inner(), (9, 9));
        assert_eq!(map.insert(1, 100).unwrap(), Some(1));
    }

    #[test]
    fn dynamic_map_grows() {
        let mut map: DynamicOrderedMap<u32, u32> = DynamicOrderedMap::with_capacity(2);
        for key in 0..100 {
            map.insert(key, key).unwrap();
        }
        assert_eq!(map.len(), 100);
        assert!(map.capacity() >= 100);
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, (0..100).collect::<Vec<u32>>());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut map: DynamicOrderedMap<u32, String> = DynamicOrderedMap::with_capacity(8);
        for key in 0..5 {
            map.insert(key, key.to_string()).unwrap();
        }
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.first(), None);
        map.clear();
        assert!(map.is_empty());

        map.insert(1, "back".to_string()).unwrap();
        assert_eq!(map.get(&1).map(String::as_str), Some("back"));
    }
}
