//! Open-hashing engine.
//!
//! [`RawTable`] is the storage and chain machinery shared by
//! [`HashMap`](crate::HashMap) and [`HashSet`](crate::HashSet). It does no
//! hashing itself: callers pass a precomputed 32-bit hash with every
//! operation, and the table spends its effort on slot placement, chain
//! maintenance, and free-list reuse.
//!
//! # Memory Layout
//!
//! Two parallel regions sized to the same prime `capacity`:
//!
//! ```text
//! buckets: [u32; capacity]          1-based entry links, 0 = empty
//! entries: [Entry<K, V>; capacity]  next/hash/state + inline key/value
//! ```
//!
//! Bucket counts come from a fixed ascending prime table, so `hash %
//! capacity` avoids the clustering that power-of-two masks produce on
//! low-entropy hashes. In `FIXED` mode both regions are carved from one
//! allocation; in `DYNAMIC` mode they are separate buffers and the table
//! expands to the next prime when out of slots.
//!
//! # Entry lifecycle
//!
//! ```text
//! None --insert--> Used --remove--> Free --insert--> Used --> ...
//! ```
//!
//! `count` is the bump high-water mark: slots above it have never been
//! touched (state `None`), slots at or below it are either `Used` (on
//! exactly one bucket chain) or `Free` (on the free list, threaded
//! through `next`). Expansion relocates the entry array, so entry
//! indices are never exposed outside this module.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use keel_buffer::{Full, RawBuffer, FIXED};

/// Highest bucket count the table will use.
///
/// Growth beyond this fails: requesting a larger capacity panics at
/// construction, and a dynamic table that is full at this capacity
/// panics on insert.
pub const MAX_CAPACITY: usize = primes::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum EntryState {
    /// Never used. The zero state, so zeroed memory is a valid table.
    None = 0,
    /// Previously used, now on the free list.
    Free = 1,
    /// Live, on exactly one bucket chain.
    Used = 2,
}

struct Entry<K, V> {
    /// 1-based link to the next entry on this chain (bucket chain when
    /// `Used`, free list when `Free`); 0 terminates.
    next: u32,
    /// Cached full 32-bit hash, compared before the key itself.
    hash: u32,
    state: EntryState,
    key: MaybeUninit<K>,
    value: MaybeUninit<V>,
}

/// Single allocation backing a `FIXED` table.
struct FixedBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Drop for FixedBlock {
    fn drop(&mut self) {
        // Safety: allocated with exactly this layout in with_capacity.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

// Safety: the block is an owned untyped region; the typed buffer views
// over it carry the element bounds.
unsafe impl Send for FixedBlock {}
unsafe impl Sync for FixedBlock {}

/// Open-hashing table with chaining and free-list slot reuse.
///
/// Keys and values are stored inline in the entry array; liveness is
/// tracked by the entry state, not by option wrappers. All operations
/// take the key's hash as an argument so the façade layer owns the
/// hasher choice.
pub struct RawTable<K, V, const MODE: bool> {
    buckets: RawBuffer<u32>,
    entries: RawBuffer<Entry<K, V>>,
    /// Backing allocation when both regions share one block (`FIXED`).
    /// Held only for its `Drop`.
    _block: Option<FixedBlock>,
    /// Bump high-water mark: entries `1..=count` have been used at least
    /// once.
    count: u32,
    free_head: u32,
    free_count: u32,
}

impl<K, V, const MODE: bool> RawTable<K, V, MODE> {
    /// Creates a table with capacity for at least `min_capacity` entries.
    ///
    /// The actual capacity is the smallest table prime at or above the
    /// request.
    ///
    /// # Panics
    ///
    /// Panics if `min_capacity` is 0 or exceeds [`MAX_CAPACITY`].
    pub fn with_capacity(min_capacity: usize) -> Self {
        assert!(min_capacity > 0, "capacity must be > 0");
        let capacity = match primes::ceil(min_capacity) {
            Some(p) => p as usize,
            None => panic!("capacity exceeds the prime table maximum"),
        };

        if MODE == FIXED {
            // One block: [buckets][entries].
            let buckets_layout = Layout::array::<u32>(capacity).expect("capacity too large");
            let entries_layout =
                Layout::array::<Entry<K, V>>(capacity).expect("capacity too large");
            let (layout, entries_offset) = buckets_layout
                .extend(entries_layout)
                .expect("layout overflow");
            let layout = layout.pad_to_align();

            let ptr = unsafe { alloc_zeroed(layout) };
            if ptr.is_null() {
                handle_alloc_error(layout);
            }
            let ptr = unsafe { NonNull::new_unchecked(ptr) };

            // Safety: both views live inside the freshly zeroed block and
            // are released with it.
            let buckets = unsafe { RawBuffer::from_raw_parts(ptr.cast::<u32>(), capacity) };
            let entries = unsafe {
                let entries_ptr = ptr.as_ptr().add(entries_offset) as *mut Entry<K, V>;
                RawBuffer::from_raw_parts(NonNull::new_unchecked(entries_ptr), capacity)
            };

            Self {
                buckets,
                entries,
                _block: Some(FixedBlock { ptr, layout }),
                count: 0,
                free_head: 0,
                free_count: 0,
            }
        } else {
            Self {
                buckets: RawBuffer::alloc_zeroed(capacity),
                entries: RawBuffer::alloc_zeroed(capacity),
                _block: None,
                count: 0,
                free_head: 0,
                free_count: 0,
            }
        }
    }

    /// Returns the number of live entries.
    #[inline]
    pub const fn len(&self) -> usize {
        (self.count - self.free_count) as usize
    }

    /// Returns `true` if the table holds no live entries.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == self.free_count
    }

    /// Returns the current capacity (a table prime).
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn entry(&self, index: u32) -> &Entry<K, V> {
        debug_assert!(index != 0 && index <= self.count);
        // Safety: entry slots are valid `Entry` values from the zeroed
        // allocation onward; key/value liveness is tracked by `state`.
        unsafe { self.entries.get_unchecked(index as usize - 1) }
    }

    #[inline]
    fn entry_mut(&mut self, index: u32) -> &mut Entry<K, V> {
        debug_assert!(index != 0 && index <= self.count);
        // Safety: as in `entry`.
        unsafe { self.entries.get_unchecked_mut(index as usize - 1) }
    }

    #[inline]
    fn bucket_link(&self, bucket: usize) -> u32 {
        // Safety: bucket < capacity, and links are plain integers.
        unsafe { self.buckets.read(bucket) }
    }

    #[inline]
    fn set_bucket_link(&mut self, bucket: usize, index: u32) {
        // Safety: bucket < capacity.
        unsafe { self.buckets.write(bucket, index) };
    }

    /// Walks the chain for `hash`, returning the index of the first
    /// `Used` entry whose stored hash and key both match.
    fn find_index<Q>(&self, key: &Q, hash: u32) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let bucket = hash as usize % self.capacity();
        let mut index = self.bucket_link(bucket);
        while index != 0 {
            let entry = self.entry(index);
            debug_assert_eq!(entry.state, EntryState::Used);
            if entry.hash == hash {
                // Safety: Used entries hold initialized keys.
                let stored = unsafe { entry.key.assume_init_ref() };
                if stored.borrow() == key {
                    return Some(index);
                }
            }
            index = entry.next;
        }
        None
    }

    /// Returns the key and value stored for `key`, if present.
    pub fn get<Q>(&self, key: &Q, hash: u32) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let index = self.find_index(key, hash)?;
        let entry = self.entry(index);
        // Safety: Used entries hold initialized pairs.
        Some(unsafe { (entry.key.assume_init_ref(), entry.value.assume_init_ref()) })
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q, hash: u32) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let index = self.find_index(key, hash)?;
        // Safety: Used entries hold initialized values.
        Some(unsafe { self.entry_mut(index).value.assume_init_mut() })
    }

    /// Returns `true` if a new slot can be taken without expanding.
    #[inline]
    fn has_slot(&self) -> bool {
        self.free_head != 0 || (self.count as usize) < self.capacity()
    }

    /// Takes a slot index off the free list, or bumps the high-water
    /// mark. Must only be called when `has_slot()`.
    fn acquire_slot(&mut self) -> u32 {
        if self.free_head != 0 {
            let index = self.free_head;
            debug_assert_eq!(self.entry(index).state, EntryState::Free);
            self.free_head = self.entry(index).next;
            self.free_count -= 1;
            return index;
        }
        debug_assert!((self.count as usize) < self.capacity());
        self.count += 1;
        self.count
    }

    /// Inserts `key`/`value` under `hash`.
    ///
    /// An existing key has its value replaced (the old value is
    /// returned); the entry itself is not relinked. A fixed table that is
    /// out of slots returns the pair in `Err(Full)`; a dynamic table
    /// expands to the next prime.
    ///
    /// # Panics
    ///
    /// Panics if a dynamic table must expand beyond [`MAX_CAPACITY`].
    pub fn insert(&mut self, key: K, hash: u32, value: V) -> Result<Option<V>, Full<(K, V)>>
    where
        K: Eq,
    {
        if let Some(index) = self.find_index(&key, hash) {
            let entry = self.entry_mut(index);
            // Safety: Used entries hold initialized values.
            let old = unsafe { entry.value.assume_init_mut() };
            return Ok(Some(mem::replace(old, value)));
        }

        if !self.has_slot() {
            if MODE == FIXED {
                return Err(Full((key, value)));
            }
            self.expand();
        }
        let index = self.acquire_slot();

        let bucket = hash as usize % self.capacity();
        let head = self.bucket_link(bucket);
        let entry = self.entry_mut(index);
        entry.next = head;
        entry.hash = hash;
        entry.state = EntryState::Used;
        entry.key = MaybeUninit::new(key);
        entry.value = MaybeUninit::new(value);
        self.set_bucket_link(bucket, index);

        Ok(None)
    }

    /// Removes the entry for `key`, returning its pair.
    pub fn remove<Q>(&mut self, key: &Q, hash: u32) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let bucket = hash as usize % self.capacity();
        let mut prev: u32 = 0;
        let mut index = self.bucket_link(bucket);
        while index != 0 {
            let entry = self.entry(index);
            let next = entry.next;
            // Safety: Used entries hold initialized keys.
            let matches =
                entry.hash == hash && unsafe { entry.key.assume_init_ref() }.borrow() == key;

            if matches {
                // Unlink from the bucket chain.
                if prev == 0 {
                    self.set_bucket_link(bucket, next);
                } else {
                    self.entry_mut(prev).next = next;
                }
                // Move the pair out and push the slot on the free list.
                let free_head = self.free_head;
                let entry = self.entry_mut(index);
                // Safety: the entry was Used; after this it is Free and
                // its pair is never read again.
                let pair = unsafe {
                    (
                        entry.key.assume_init_read(),
                        entry.value.assume_init_read(),
                    )
                };
                entry.state = EntryState::Free;
                entry.next = free_head;
                self.free_head = index;
                self.free_count += 1;
                return Some(pair);
            }

            prev = index;
            index = next;
        }
        None
    }

    /// Expands a dynamic table to the next prime capacity and rewrites
    /// every chain from a full rescan of the entry array.
    fn expand(&mut self) {
        debug_assert!(MODE != FIXED);
        let new_capacity = match primes::above(self.capacity()) {
            Some(p) => p as usize,
            None => panic!("capacity exceeds the prime table maximum"),
        };

        // Fresh zeroed buckets; the entry array relocates bitwise.
        self.buckets = RawBuffer::alloc_zeroed(new_capacity);
        self.entries.grow(new_capacity);

        // Every entry at or below the high-water mark is rethreaded by
        // its prior state: Used entries onto their new bucket chain,
        // Free entries onto a rebuilt free list.
        self.free_head = 0;
        self.free_count = 0;
        for index in 1..=self.count {
            let state = self.entry(index).state;
            match state {
                EntryState::Used => {
                    let hash = self.entry(index).hash;
                    let bucket = hash as usize % new_capacity;
                    let head = self.bucket_link(bucket);
                    self.entry_mut(index).next = head;
                    self.set_bucket_link(bucket, index);
                }
                EntryState::Free => {
                    let head = self.free_head;
                    self.entry_mut(index).next = head;
                    self.free_head = index;
                    self.free_count += 1;
                }
                EntryState::None => {
                    debug_assert!(false, "entry below high-water mark has no state");
                }
            }
        }
    }

    /// Drops every live pair and resets all chains. Idempotent; capacity
    /// is kept.
    pub fn clear(&mut self) {
        for index in 1..=self.count {
            let entry = self.entry_mut(index);
            if entry.state == EntryState::Used {
                // Safety: Used entries hold initialized pairs; the state
                // reset below retires them.
                unsafe {
                    entry.key.assume_init_drop();
                    entry.value.assume_init_drop();
                }
            }
            entry.state = EntryState::None;
            entry.next = 0;
        }
        let capacity = self.buckets.len();
        // Safety: full bucket range, plain integers.
        unsafe { self.buckets.zero(0, capacity) };
        self.count = 0;
        self.free_head = 0;
        self.free_count = 0;
    }

    /// Returns an iterator over the live pairs in storage order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: entries_ptr(&self.entries),
            index: 0,
            count: self.count,
            remaining: self.len(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over the live pairs with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            entries: entries_ptr(&self.entries),
            index: 0,
            count: self.count,
            remaining: self.len(),
            _marker: PhantomData,
        }
    }
}

#[inline]
fn entries_ptr<K, V>(entries: &RawBuffer<Entry<K, V>>) -> NonNull<Entry<K, V>> {
    // Safety: RawBuffer base pointers are never null.
    unsafe { NonNull::new_unchecked(entries.as_ptr()) }
}

impl<K, V, const MODE: bool> Drop for RawTable<K, V, MODE> {
    fn drop(&mut self) {
        for index in 1..=self.count {
            let entry = self.entry_mut(index);
            if entry.state == EntryState::Used {
                // Safety: Used entries hold initialized pairs.
                unsafe {
                    entry.key.assume_init_drop();
                    entry.value.assume_init_drop();
                }
            }
        }
        // Buffer and block fields release the memory.
    }
}

impl<K, V, const MODE: bool> fmt::Debug for RawTable<K, V, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTable")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Iterator over the live pairs of a [`RawTable`].
pub struct Iter<'a, K, V> {
    entries: NonNull<Entry<K, V>>,
    index: u32,
    count: u32,
    remaining: usize,
    _marker: PhantomData<&'a Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        while self.index < self.count {
            // Safety: index stays below the high-water mark, which is
            // within the entry array.
            let entry = unsafe { &*self.entries.as_ptr().add(self.index as usize) };
            self.index += 1;
            if entry.state == EntryState::Used {
                self.remaining -= 1;
                // Safety: Used entries hold initialized pairs.
                return Some(unsafe {
                    (entry.key.assume_init_ref(), entry.value.assume_init_ref())
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over the live pairs of a [`RawTable`] with mutable values.
pub struct IterMut<'a, K, V> {
    entries: NonNull<Entry<K, V>>,
    index: u32,
    count: u32,
    remaining: usize,
    _marker: PhantomData<&'a mut Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<(&'a K, &'a mut V)> {
        while self.index < self.count {
            // Safety: index is in bounds and this iterator holds the
            // only live borrow of the table.
            let entry = unsafe { &mut *self.entries.as_ptr().add(self.index as usize) };
            self.index += 1;
            if entry.state == EntryState::Used {
                self.remaining -= 1;
                // Safety: Used entries hold initialized pairs.
                return Some(unsafe {
                    (entry.key.assume_init_ref(), entry.value.assume_init_mut())
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

mod primes {
    //! The fixed ascending bucket-count table.
    //!
    //! Starts small for tiny collections, then follows the classic
    //! near-doubling prime sequence. Growth past the last entry fails.

    #[rustfmt::skip]
    pub(super) const TABLE: &[u32] = &[
        3, 7, 17, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289,
        24593, 49157, 98317, 196_613, 393_241, 786_433, 1_572_869,
        3_145_739, 6_291_469, 12_582_917, 25_165_843, 50_331_653,
        100_663_319, 201_326_611, 402_653_189, 805_306_457, 1_610_612_741,
    ];

    pub(super) const MAX: u32 = TABLE[TABLE.len() - 1];

    /// Smallest table prime at or above `min`.
    pub(super) fn ceil(min: usize) -> Option<u32> {
        TABLE.iter().copied().find(|&p| p as usize >= min)
    }

    /// Smallest table prime strictly above `current`.
    pub(super) fn above(current: usize) -> Option<u32> {
        TABLE.iter().copied().find(|&p| p as usize > current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_buffer::DYNAMIC;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // The engine takes hashes as arguments, so tests can pick them to
    // force or avoid collisions.
    fn h(key: u32) -> u32 {
        key.wrapping_mul(2_654_435_761)
    }

    // ===== Basic operations =====

    #[test]
    fn insert_get_remove() {
        let mut table: RawTable<u32, &str, DYNAMIC> = RawTable::with_capacity(8);
        assert_eq!(table.insert(1, h(1), "one").unwrap(), None);
        assert_eq!(table.insert(2, h(2), "two").unwrap(), None);

        assert_eq!(table.get(&1, h(1)), Some((&1, &"one")));
        assert_eq!(table.get(&2, h(2)), Some((&2, &"two")));
        assert_eq!(table.get(&3, h(3)), None);
        assert_eq!(table.len(), 2);

        assert_eq!(table.remove(&1, h(1)), Some((1, "one")));
        assert_eq!(table.get(&1, h(1)), None);
        assert_eq!(table.remove(&1, h(1)), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_existing_replaces_value() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(8);
        assert_eq!(table.insert(5, h(5), 100).unwrap(), None);
        assert_eq!(table.insert(5, h(5), 200).unwrap(), Some(100));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&5, h(5)), Some((&5, &200)));
    }

    #[test]
    fn capacity_rounds_to_prime() {
        let table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(10);
        assert_eq!(table.capacity(), 17);

        let table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(17);
        assert_eq!(table.capacity(), 17);
    }

    // ===== Collisions =====

    #[test]
    fn colliding_hashes_chain_and_resolve_by_key() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(3);
        // Same hash for all three keys: one chain, three entries.
        for key in [10, 20, 30] {
            table.insert(key, 7, key * 2).unwrap();
        }
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&10, 7), Some((&10, &20)));
        assert_eq!(table.get(&20, 7), Some((&20, &40)));
        assert_eq!(table.get(&30, 7), Some((&30, &60)));

        // Unlink from the middle of the chain.
        assert_eq!(table.remove(&20, 7), Some((20, 40)));
        assert_eq!(table.get(&10, 7), Some((&10, &20)));
        assert_eq!(table.get(&30, 7), Some((&30, &60)));
    }

    #[test]
    fn hash_mismatch_skips_entry() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(3);
        table.insert(1, 9, 10).unwrap();
        // Same bucket (9 % 3 == 0 == 3 % 3) but a different stored hash.
        assert_eq!(table.get(&1, 3), None);
        assert_eq!(table.remove(&1, 3), None);
        assert_eq!(table.len(), 1);
    }

    // ===== Free list =====

    #[test]
    fn removed_slot_is_reused() {
        let mut table: RawTable<u32, u32, FIXED> = RawTable::with_capacity(3);
        for key in [1, 2, 3] {
            table.insert(key, h(key), key).unwrap();
        }
        // Out of slots.
        assert!(table.insert(4, h(4), 4).is_err());

        table.remove(&2, h(2)).unwrap();
        // The freed slot makes the insert fit again.
        table.insert(4, h(4), 4).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&4, h(4)), Some((&4, &4)));
        assert_eq!(table.get(&2, h(2)), None);
    }

    // ===== Capacity modes =====

    #[test]
    fn fixed_full_returns_pair() {
        let mut table: RawTable<u32, &str, FIXED> = RawTable::with_capacity(3);
        for key in [1, 2, 3] {
            table.insert(key, h(key), "x").unwrap();
        }
        let err = table.insert(9, h(9), "y").unwrap_err();
        assert_eq!(err.into_inner(), (9, "y"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn dynamic_expands_across_primes() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(3);
        for key in 0..200 {
            table.insert(key, h(key), key * 3).unwrap();
        }
        assert_eq!(table.len(), 200);
        assert!(table.capacity() >= 200);
        for key in 0..200 {
            assert_eq!(table.get(&key, h(key)), Some((&key, &(key * 3))));
        }
    }

    #[test]
    fn expansion_after_churn_preserves_entries() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(3);
        for key in [1, 2, 3] {
            table.insert(key, h(key), key).unwrap();
        }
        table.remove(&2, h(2)).unwrap();

        // The free slot absorbs one insert; the next one expands a table
        // whose entry array has been through a remove/reuse cycle.
        table.insert(4, h(4), 4).unwrap();
        table.insert(5, h(5), 5).unwrap();
        assert!(table.capacity() > 3);

        assert_eq!(table.len(), 4);
        for key in [1, 3, 4, 5] {
            assert_eq!(table.get(&key, h(key)), Some((&key, &key)));
        }
        assert_eq!(table.get(&2, h(2)), None);
    }

    // ===== Iteration =====

    #[test]
    fn iter_visits_each_live_pair_once() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(8);
        for key in 0..6 {
            table.insert(key, h(key), key * 10).unwrap();
        }
        table.remove(&3, h(3)).unwrap();

        let mut seen: Vec<u32> = table.iter().map(|(&k, _)| k).collect();
        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 4, 5]);
        assert_eq!(table.iter().len(), 5);
    }

    #[test]
    fn iter_mut_updates_values() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(8);
        for key in 0..4 {
            table.insert(key, h(key), key).unwrap();
        }
        for (_, value) in table.iter_mut() {
            *value += 100;
        }
        for key in 0..4 {
            assert_eq!(table.get(&key, h(key)), Some((&key, &(key + 100))));
        }
    }

    // ===== Lifecycle =====

    #[test]
    fn clear_is_idempotent() {
        let mut table: RawTable<u32, u32, DYNAMIC> = RawTable::with_capacity(8);
        for key in 0..5 {
            table.insert(key, h(key), key).unwrap();
        }
        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.get(&1, h(1)), None);

        table.clear();
        assert_eq!(table.len(), 0);

        // The table is fully usable after clearing.
        table.insert(9, h(9), 9).unwrap();
        assert_eq!(table.get(&9, h(9)), Some((&9, &9)));
    }

    #[test]
    fn drop_cleans_up() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug, PartialEq, Eq, Hash)]
        struct Droppable(u32);
        impl Drop for Droppable {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let mut table: RawTable<u32, Droppable, DYNAMIC> = RawTable::with_capacity(8);
            for key in 0..4 {
                table.insert(key, h(key), Droppable(key)).unwrap();
            }
            let removed = table.remove(&0, h(0));
            drop(removed);
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
        }
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn replaced_value_is_returned_not_dropped_in_place() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Droppable;
        impl Drop for Droppable {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut table: RawTable<u32, Droppable, DYNAMIC> = RawTable::with_capacity(8);
        table.insert(1, h(1), Droppable).unwrap();
        let old = table.insert(1, h(1), Droppable).unwrap();
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);
        drop(old);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
    }

    // ===== Prime table =====

    #[test]
    fn prime_table_is_strictly_ascending() {
        for pair in primes::TABLE.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prime_ceiling_is_enforced() {
        assert_eq!(primes::ceil(1), Some(3));
        assert_eq!(primes::ceil(4), Some(7));
        assert_eq!(primes::ceil(primes::MAX as usize), Some(primes::MAX));
        assert_eq!(primes::ceil(primes::MAX as usize + 1), None);
        assert_eq!(primes::above(primes::MAX as usize), None);
    }

    #[test]
    #[should_panic(expected = "capacity exceeds the prime table maximum")]
    fn oversized_capacity_panics() {
        let _table: RawTable<u32, u32, DYNAMIC> =
            RawTable::with_capacity(MAX_CAPACITY + 1);
    }
}
