//! Hash map façade over the open-hashing engine.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use keel_buffer::{Full, DYNAMIC, FIXED};

use crate::table::{self, RawTable};

/// A hash map over manually allocated storage.
///
/// Hashing uses [`ahash`] by default; the engine stores the hash
/// truncated to 32 bits next to each entry and compares it before
/// touching the key. `MODE` selects fixed or expanding capacity exactly
/// as in the rest of the workspace.
///
/// Iteration order is storage order: unspecified and not the insertion
/// order once slots have been reused.
///
/// # Example
///
/// ```
/// use keel_collections::DynamicHashMap;
///
/// let mut map: DynamicHashMap<String, u32> = DynamicHashMap::with_capacity(8);
/// map.insert("alpha".to_string(), 1).unwrap();
/// map.insert("beta".to_string(), 2).unwrap();
///
/// // Borrowed lookups work like std's maps.
/// assert_eq!(map.get("alpha"), Some(&1));
/// assert_eq!(map.remove("beta"), Some(2));
/// ```
pub struct HashMap<K, V, const MODE: bool, S = ahash::RandomState> {
    table: RawTable<K, V, MODE>,
    hasher: S,
}

/// Type alias for a fixed-capacity hash map.
pub type FixedHashMap<K, V, S = ahash::RandomState> = HashMap<K, V, FIXED, S>;

/// Type alias for an expanding hash map.
pub type DynamicHashMap<K, V, S = ahash::RandomState> = HashMap<K, V, DYNAMIC, S>;

impl<K, V, const MODE: bool, S: Default> HashMap<K, V, MODE, S> {
    /// Creates a map with capacity for at least `capacity` entries and a
    /// default hasher.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or exceeds
    /// [`MAX_CAPACITY`](crate::table::MAX_CAPACITY).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, const MODE: bool, S> HashMap<K, V, MODE, S> {
    /// Creates a map with capacity for at least `capacity` entries and
    /// the given hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            table: RawTable::with_capacity(capacity),
            hasher,
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the current capacity (a table prime).
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the hasher.
    #[inline]
    pub const fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Drops every entry. Idempotent; capacity is kept.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> table::Iter<'_, K, V> {
        self.table.iter()
    }

    /// Returns an iterator over the entries with mutable values.
    pub fn iter_mut(&mut self) -> table::IterMut<'_, K, V> {
        self.table.iter_mut()
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.table.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.table.iter().map(|(_, v)| v)
    }

    /// Returns an iterator over mutable values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.table.iter_mut().map(|(_, v)| v)
    }
}

impl<K, V, const MODE: bool, S: BuildHasher> HashMap<K, V, MODE, S> {
    #[inline]
    fn hash_of<Q>(&self, key: &Q) -> u32
    where
        Q: Hash + ?Sized,
    {
        // The engine stores 32-bit hashes; truncation keeps the entry
        // header small and the full 64 bits buy nothing at these table
        // sizes.
        self.hasher.hash_one(key) as u32
    }

    /// Inserts a key/value pair, returning the previous value for the
    /// key if there was one.
    ///
    /// A fixed map that is out of slots hands the pair back in
    /// `Err(Full)`.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Full<(K, V)>>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_of(&key);
        self.table.insert(key, hash, value)
    }

    /// Returns a reference to the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.table.get(key, hash).map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.table.get(key, hash)
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.table.get_mut(key, hash)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.table.remove(key, hash)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, const MODE: bool, S> fmt::Debug for HashMap<K, V, MODE, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ===== Basic operations =====

    #[test]
    fn insert_get_remove() {
        let mut map: DynamicHashMap<u64, &str> = DynamicHashMap::with_capacity(8);
        assert_eq!(map.insert(1, "one").unwrap(), None);
        assert_eq!(map.insert(2, "two").unwrap(), None);

        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.get(&3), None);
        assert!(map.contains_key(&2));
        assert_eq!(map.len(), 2);

        assert_eq!(map.remove(&1), Some("one"));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_replaces_and_returns_old() {
        let mut map: DynamicHashMap<&str, u32> = DynamicHashMap::with_capacity(8);
        assert_eq!(map.insert("k", 1).unwrap(), None);
        assert_eq!(map.insert("k", 2).unwrap(), Some(1));
        assert_eq!(map.get("k"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn borrowed_key_lookup() {
        let mut map: DynamicHashMap<String, u32> = DynamicHashMap::with_capacity(8);
        map.insert("hello".to_string(), 5).unwrap();

        assert_eq!(map.get("hello"), Some(&5));
        assert_eq!(map.get_key_value("hello"), Some((&"hello".to_string(), &5)));
        assert_eq!(map.remove("hello"), Some(5));
        assert!(map.is_empty());
    }

    #[test]
    fn get_mut_and_values_mut() {
        let mut map: DynamicHashMap<u32, u32> = DynamicHashMap::with_capacity(8);
        for k in 0..4 {
            map.insert(k, 0).unwrap();
        }
        *map.get_mut(&2).unwrap() = 9;
        assert_eq!(map.get(&2), Some(&9));

        for v in map.values_mut() {
            *v += 1;
        }
        assert_eq!(map.get(&2), Some(&10));
        assert_eq!(map.get(&0), Some(&1));
    }

    // ===== Capacity modes =====

    #[test]
    fn fixed_map_full_returns_pair() {
        let mut map: FixedHashMap<u32, u32> = FixedHashMap::with_capacity(3);
        assert_eq!(map.capacity(), 3);
        for k in 0..3 {
            map.insert(k, k).unwrap();
        }
        let err = map.insert(9, 9).unwrap_err();
        assert_eq!(err.into_inner(), (9, 9));

        // Replacing an existing key still works at capacity.
        assert_eq!(map.insert(1, 100).unwrap(), Some(1));
    }

    #[test]
    fn dynamic_map_grows_through_many_primes() {
        let mut map: DynamicHashMap<u32, u32> = DynamicHashMap::with_capacity(1);
        for k in 0..1000 {
            map.insert(k, k * 2).unwrap();
        }
        assert_eq!(map.len(), 1000);
        for k in 0..1000 {
            assert_eq!(map.get(&k), Some(&(k * 2)));
        }
    }

    // ===== Iteration =====

    #[test]
    fn iteration_matches_len() {
        let mut map: DynamicHashMap<u32, u32> = DynamicHashMap::with_capacity(8);
        for k in 0..10 {
            map.insert(k, k).unwrap();
        }
        map.remove(&4).unwrap();
        map.remove(&7).unwrap();

        assert_eq!(map.iter().count(), map.len());
        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, [0, 1, 2, 3, 5, 6, 8, 9]);
    }

    // ===== Lifecycle =====

    #[test]
    fn clear_is_idempotent() {
        let mut map: DynamicHashMap<u32, String> = DynamicHashMap::with_capacity(8);
        for k in 0..5 {
            map.insert(k, k.to_string()).unwrap();
        }
        map.clear();
        assert!(map.is_empty());
        map.clear();
        assert!(map.is_empty());

        map.insert(1, "back".to_string()).unwrap();
        assert_eq!(map.get(&1).map(String::as_str), Some("back"));
    }

    #[test]
    fn drop_cleans_up() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Droppable;
        impl Drop for Droppable {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let mut map: DynamicHashMap<u32, Droppable> = DynamicHashMap::with_capacity(8);
            for k in 0..6 {
                map.insert(k, Droppable).unwrap();
            }
        }
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 6);
    }

    // ===== Property tests =====

    use proptest::prelude::*;

    proptest! {
        // Round-trip against the std map: contains iff inserted and not
        // since removed, and len tracks the distinct live keys.
        #[test]
        fn behaves_like_std_hashmap(
            ops in proptest::collection::vec((0u8..32, any::<bool>(), any::<u16>()), 0..400)
        ) {
            let mut map: DynamicHashMap<u8, u16> = DynamicHashMap::with_capacity(1);
            let mut oracle: std::collections::HashMap<u8, u16> = std::collections::HashMap::new();

            for (key, is_insert, value) in ops {
                if is_insert {
                    let mine = map.insert(key, value).unwrap();
                    let theirs = oracle.insert(key, value);
                    prop_assert_eq!(mine, theirs);
                } else {
                    prop_assert_eq!(map.remove(&key), oracle.remove(&key));
                }
                prop_assert_eq!(map.len(), oracle.len());
            }

            for key in 0u8..32 {
                prop_assert_eq!(map.get(&key), oracle.get(&key));
            }
        }
    }
}
