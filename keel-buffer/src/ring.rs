//! Fixed circular buffer that overwrites the oldest element.

use std::fmt;
use std::ptr;

use crate::raw::RawBuffer;

/// A fixed-capacity circular buffer.
///
/// Unlike [`Queue`](crate::Queue), a full ring never rejects a push: the
/// oldest element is displaced and handed back to the caller. Useful for
/// "last N samples" histories where old data losing to new data is the
/// point.
///
/// # Example
///
/// ```
/// use keel_buffer::Ring;
///
/// let mut ring: Ring<u32> = Ring::with_capacity(2);
/// assert_eq!(ring.push(1), None);
/// assert_eq!(ring.push(2), None);
///
/// // Full: pushing displaces the oldest.
/// assert_eq!(ring.push(3), Some(1));
/// assert_eq!(ring.pop(), Some(2));
/// ```
pub struct Ring<T> {
    buf: RawBuffer<T>,
    head: usize,
    len: usize,
}

impl<T> Ring<T> {
    /// Creates a ring with room for at least `capacity` elements.
    ///
    /// Actual capacity is rounded up to the next power of two.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            buf: RawBuffer::alloc_zeroed(capacity.next_power_of_two()),
            head: 0,
            len: 0,
        }
    }

    /// Returns the number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the ring holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the next push will displace the oldest element.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    #[inline]
    const fn mask(&self) -> usize {
        self.buf.len() - 1
    }

    /// Appends `value`. If the ring is full, removes and returns the
    /// oldest element to make room.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.len == self.buf.len() {
            // Safety: the oldest slot is live and is immediately
            // overwritten by the new value.
            let displaced = unsafe { self.buf.read(self.head) };
            unsafe { self.buf.write(self.head, value) };
            self.head = (self.head + 1) & self.mask();
            return Some(displaced);
        }
        let slot = (self.head + self.len) & self.mask();
        // Safety: not full, so the slot past the back is free.
        unsafe { self.buf.write(slot, value) };
        self.len += 1;
        None
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // Safety: oldest slot is live.
        let value = unsafe { self.buf.read(self.head) };
        self.head = (self.head + 1) & self.mask();
        self.len -= 1;
        Some(value)
    }

    /// Returns a reference to the oldest element.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        // Safety: oldest slot is live.
        Some(unsafe { self.buf.get_unchecked(self.head) })
    }

    /// Returns the element at logical position `index` from the oldest.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let slot = (self.head + index) & self.mask();
        // Safety: logical index maps into the live range.
        Some(unsafe { self.buf.get_unchecked(slot) })
    }

    /// Returns an iterator from oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { ring: self, pos: 0 }
    }

    /// Drops every element and resets the ring. Idempotent.
    pub fn clear(&mut self) {
        let head = self.head;
        let len = self.len;
        let mask = self.mask();
        self.head = 0;
        self.len = 0;
        for i in 0..len {
            // Safety: each live slot is dropped exactly once.
            unsafe {
                ptr::drop_in_place(self.buf.slot_ptr((head + i) & mask));
            }
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a [`Ring`] from oldest to newest.
pub struct Iter<'a, T> {
    ring: &'a Ring<T>,
    pos: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let item = self.ring.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ring.len - self.pos;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
