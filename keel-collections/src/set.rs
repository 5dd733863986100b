//! Hash set façade.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use keel_buffer::{Full, DYNAMIC, FIXED};

use crate::map::HashMap;

/// A hash set: a [`HashMap`] with unit values.
///
/// # Example
///
/// ```
/// use keel_collections::DynamicHashSet;
///
/// let mut set: DynamicHashSet<u32> = DynamicHashSet::with_capacity(8);
/// assert!(set.insert(7).unwrap());
/// assert!(!set.insert(7).unwrap());
/// assert!(set.contains(&7));
/// ```
pub struct HashSet<K, const MODE: bool, S = ahash::RandomState> {
    map: HashMap<K, (), MODE, S>,
}

/// Type alias for a fixed-capacity hash set.
pub type FixedHashSet<K, S = ahash::RandomState> = HashSet<K, FIXED, S>;

/// Type alias for an expanding hash set.
pub type DynamicHashSet<K, S = ahash::RandomState> = HashSet<K, DYNAMIC, S>;

impl<K, const MODE: bool, S: Default> HashSet<K, MODE, S> {
    /// Creates a set with capacity for at least `capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or exceeds
    /// [`MAX_CAPACITY`](crate::table::MAX_CAPACITY).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }
}

impl<K, const MODE: bool, S> HashSet<K, MODE, S> {
    /// Creates a set with the given hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, hasher),
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

    /// Returns the current capacity (a table prime).
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Drops every key. Idempotent; capacity is kept.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns an iterator over the keys.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }
}

impl<K, const MODE: bool, S: BuildHasher> HashSet<K, MODE, S> {
    /// Inserts `key`. Returns `true` if it was not already present.
    ///
    /// A fixed set that is out of slots hands the key back in
    /// `Err(Full)`.
    pub fn insert(&mut self, key: K) -> Result<bool, Full<K>>
    where
        K: Hash + Eq,
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
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns the stored key equal to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_key_value(key).map(|(k, _)| k)
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Removes and returns the stored key equal to `key`.
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove_entry(key).map(|(k, ())| k)
    }
}

impl<K: fmt::Debug, const MODE: bool, S> fmt::Debug for HashSet<K, MODE, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut set: DynamicHashSet<u32> = DynamicHashSet::with_capacity(8);
        assert!(set.insert(1).unwrap());
        assert!(!set.insert(1).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn contains_remove_roundtrip() {
        let mut set: DynamicHashSet<String> = DynamicHashSet::with_capacity(8);
        set.insert("a".to_string()).unwrap();

        assert!(set.contains("a"));
        assert_eq!(set.get("a"), Some(&"a".to_string()));
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
        assert!(!set.contains("a"));
    }

    #[test]
    fn take_returns_stored_key() {
        let mut set: DynamicHashSet<String> = DynamicHashSet::with_capacity(8);
        set.insert("key".to_string()).unwrap();
        assert_eq!(set.take("key"), Some("key".to_string()));
        assert_eq!(set.take("key"), None);
    }

    #[test]
    fn fixed_full_returns_key() {
        let mut set: FixedHashSet<u32> = FixedHashSet::with_capacity(3);
        for k in 0..3 {
            set.insert(k).unwrap();
        }
        let err = set.insert(9).unwrap_err();
        assert_eq!(err.into_inner(), 9);
        // Re-inserting an existing key is not a capacity event.
        assert!(!set.insert(1).unwrap());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut set: DynamicHashSet<u32> = DynamicHashSet::with_capacity(8);
        for k in 0..5 {
            set.insert(k).unwrap();
        }
        set.clear();
        assert!(set.is_empty());
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn iter_yields_each_key_once() {
        let mut set: DynamicHashSet<u32> = DynamicHashSet::with_capacity(8);
        for k in 0..6 {
            set.insert(k).unwrap();
        }
        set.remove(&3);

        let mut seen: Vec<u32> = set.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 4, 5]);
    }
}
