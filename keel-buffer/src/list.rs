//! Contiguous growable list.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::ptr;
use std::slice;

use crate::raw::RawBuffer;
use crate::{Full, DYNAMIC, FIXED};

/// A contiguous list with vec-like semantics over a [`RawBuffer`].
///
/// `MODE` selects the growth policy: [`FIXED`](crate::FIXED) lists never
/// reallocate and report [`Full`] when at capacity, [`DYNAMIC`](crate::DYNAMIC)
/// lists double their buffer instead. Elements before `len` are live;
/// `insert` and `remove` shift the tail with an overlap-safe raw copy.
///
/// # Example
///
/// ```
/// use keel_buffer::FixedList;
///
/// let mut list: FixedList<u32> = FixedList::with_capacity(2);
/// list.push(1).unwrap();
/// list.push(2).unwrap();
///
/// // At capacity: the value comes back in the error.
/// let err = list.push(3).unwrap_err();
/// assert_eq!(err.into_inner(), 3);
/// ```
pub struct List<T, const MODE: bool> {
    buf: RawBuffer<T>,
    len: usize,
}

/// Type alias for a fixed-capacity list.
pub type FixedList<T> = List<T, FIXED>;

/// Type alias for a growable list.
pub type DynamicList<T> = List<T, DYNAMIC>;

impl<T, const MODE: bool> List<T, MODE> {
    /// Creates a list with room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            buf: RawBuffer::alloc_zeroed(capacity),
            len: 0,
        }
    }

    /// Returns the number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if `len() == capacity()`.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    fn reserve_one(&mut self) {
        let new_cap = self.buf.len() * 2;
        self.buf.grow(new_cap);
    }

    /// Appends `value` to the end of the list.
    ///
    /// Fixed lists return `Err(Full(value))` at capacity; dynamic lists
    /// double their buffer and always succeed.
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        if self.len == self.buf.len() {
            if MODE == FIXED {
                return Err(Full(value));
            }
            self.reserve_one();
        }
        // Safety: len < capacity after the check above.
        unsafe { self.buf.write(self.len, value) };
        self.len += 1;
        Ok(())
    }

    /// Inserts `value` at `index`, shifting everything after it right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), Full<T>> {
        assert!(index <= self.len, "index out of bounds");
        if self.len == self.buf.len() {
            if MODE == FIXED {
                return Err(Full(value));
            }
            self.reserve_one();
        }
        // Safety: the shifted range and the hole are within capacity; the
        // shift duplicates bytes the write below immediately replaces.
        unsafe {
            self.buf.copy_within(index, index + 1, self.len - index);
            self.buf.write(index, value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "index out of bounds");
        // Safety: slot is live; the shift reclaims its bytes.
        let value = unsafe { self.buf.read(index) };
        unsafe {
            self.buf.copy_within(index + 1, index, self.len - index - 1);
        }
        self.len -= 1;
        value
    }

    /// Removes and returns the element at `index`, moving the last element
    /// into the hole. O(1), does not preserve order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "index out of bounds");
        // Safety: both slots are live; the last slot's bytes move into
        // the hole and its old copy is abandoned.
        let value = unsafe { self.buf.read(index) };
        self.len -= 1;
        if index != self.len {
            unsafe {
                let last = self.buf.read(self.len);
                self.buf.write(index, last);
            }
        }
        value
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: slot was live before the decrement.
        Some(unsafe { self.buf.read(self.len) })
    }

    /// Returns a reference to the element at `index`, or `None` if out of
    /// bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        // Safety: in bounds of the live prefix.
        Some(unsafe { self.buf.get_unchecked(index) })
    }

    /// Returns a mutable reference to the element at `index`, or `None` if
    /// out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        // Safety: in bounds of the live prefix.
        Some(unsafe { self.buf.get_unchecked_mut(index) })
    }

    /// Returns the index of the first element equal to `value`.
    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        // Safety: [0, len) is the live prefix.
        unsafe { self.buf.index_of(value, 0, self.len) }
    }

    /// Returns the index of the last element equal to `value`.
    pub fn last_index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        // Safety: [0, len) is the live prefix.
        unsafe { self.buf.last_index_of(value, 0, self.len) }
    }

    /// Returns the live elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // Safety: [0, len) is initialized.
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    /// Returns the live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: [0, len) is initialized.
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Drops every element and resets the length to 0. Idempotent; the
    /// buffer is kept.
    pub fn clear(&mut self) {
        // Safety: [0, len) are live exactly once; len is reset before
        // anything can observe them again.
        unsafe {
            let live = slice::from_raw_parts_mut(self.buf.as_ptr(), self.len);
            self.len = 0;
            ptr::drop_in_place(live);
        }
    }
}

impl<T, const MODE: bool> Drop for List<T, MODE> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const MODE: bool> Index<usize> for List<T, MODE> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T, const MODE: bool> IndexMut<usize> for List<T, MODE> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: fmt::Debug, const MODE: bool> fmt::Debug for List<T, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
