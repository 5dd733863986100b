//! Single-threaded FIFO ring.

use std::fmt;
use std::ptr;

use crate::raw::RawBuffer;
use crate::{Full, DYNAMIC, FIXED};

/// A first-in-first-out queue over a circular [`RawBuffer`].
///
/// Capacity is rounded up to a power of two so slot indexing is a mask
/// instead of a modulo. `head` tracks the physical index of the front
/// element; pushes land at `(head + len) & mask`. When a dynamic queue
/// grows, the live elements are copied to the front of the new buffer in
/// logical order, so wraparound state never survives a growth.
///
/// This type is single-threaded. The lock-free counterparts live in the
/// `keel-queue` crate.
///
/// # Example
///
/// ```
/// use keel_buffer::FixedQueue;
///
/// let mut q: FixedQueue<u32> = FixedQueue::with_capacity(4);
/// q.push(1).unwrap();
/// q.push(2).unwrap();
/// assert_eq!(q.pop(), Some(1));
/// assert_eq!(q.pop(), Some(2));
/// ```
pub struct Queue<T, const MODE: bool> {
    buf: RawBuffer<T>,
    head: usize,
    len: usize,
}

/// Type alias for a fixed-capacity FIFO queue.
pub type FixedQueue<T> = Queue<T, FIXED>;

/// Type alias for a growable FIFO queue.
pub type DynamicQueue<T> = Queue<T, DYNAMIC>;

impl<T, const MODE: bool> Queue<T, MODE> {
    /// Creates a queue with room for at least `capacity` elements.
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

    /// Returns `true` if the queue holds no elements.
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

    #[inline]
    const fn mask(&self) -> usize {
        self.buf.len() - 1
    }

    #[inline]
    const fn slot(&self, logical: usize) -> usize {
        (self.head + logical) & self.mask()
    }

    fn grow_and_linearize(&mut self) {
        let old_cap = self.buf.len();
        let mut grown = RawBuffer::alloc_zeroed(old_cap * 2);
        let front_len = (old_cap - self.head).min(self.len);
        // Safety: both segments are live, in bounds, and land in a fresh
        // buffer; the old buffer frees its region without dropping the
        // relocated elements.
        unsafe {
            grown.copy_from(0, &self.buf, self.head, front_len);
            grown.copy_from(front_len, &self.buf, 0, self.len - front_len);
        }
        self.buf = grown;
        self.head = 0;
    }

    /// Appends `value` to the back of the queue.
    ///
    /// Fixed queues return `Err(Full(value))` at capacity; dynamic queues
    /// double and re-linearize.
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        if self.len == self.buf.len() {
            if MODE == FIXED {
                return Err(Full(value));
            }
            self.grow_and_linearize();
        }
        let slot = self.slot(self.len);
        // Safety: not full, so the slot past the back is free.
        unsafe { self.buf.write(slot, value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the front element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // Safety: front slot is live.
        let value = unsafe { self.buf.read(self.head) };
        self.head = (self.head + 1) & self.mask();
        self.len -= 1;
        Some(value)
    }

    /// Returns a reference to the front element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        // Safety: front slot is live.
        Some(unsafe { self.buf.get_unchecked(self.head) })
    }

    /// Returns the element at logical position `index` from the front.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        // Safety: logical index maps into the live range.
        Some(unsafe { self.buf.get_unchecked(self.slot(index)) })
    }

    /// Returns an iterator in logical front-to-back order.
    pub fn iter(&self) -> Iter<'_, T, MODE> {
        Iter { queue: self, pos: 0 }
    }

    /// Drops every element and resets the queue. Idempotent; the buffer
    /// is kept.
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

impl<T, const MODE: bool> Drop for Queue<T, MODE> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, const MODE: bool> fmt::Debug for Queue<T, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a [`Queue`] in logical order.
pub struct Iter<'a, T, const MODE: bool> {
    queue: &'a Queue<T, MODE>,
    pos: usize,
}

impl<'a, T, const MODE: bool> Iterator for Iter<'a, T, MODE> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let item = self.queue.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.queue.len - self.pos;
        (remaining, Some(remaining))
    }
}

impl<T, const MODE: bool> ExactSizeIterator for Iter<'_, T, MODE> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ===== Basic operations =====

    #[test]
    fn fifo_order() {
        let mut q: DynamicQueue<u32> = DynamicQueue::with_capacity(8);
        for v in 0..5 {
            q.push(v).unwrap();
        }
        for v in 0..5 {
            assert_eq!(q.pop(), Some(v));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn capacity_rounds_to_power_of_two() {
        let q: DynamicQueue<u32> = DynamicQueue::with_capacity(10);
        assert_eq!(q.capacity(), 16);

        let q: DynamicQueue<u32> = DynamicQueue::with_capacity(16);
        assert_eq!(q.capacity(), 16);
    }

    #[test]
    fn peek_and_get_are_logical() {
        let mut q: FixedQueue<u32> = FixedQueue::with_capacity(4);
        q.push(10).unwrap();
        q.push(20).unwrap();
        q.pop();
        q.push(30).unwrap();

        assert_eq!(q.peek(), Some(&20));
        assert_eq!(q.get(0), Some(&20));
        assert_eq!(q.get(1), Some(&30));
        assert_eq!(q.get(2), None);
    }

    // ===== Wraparound =====

    #[test]
    fn multiple_wraparounds() {
        let mut q: FixedQueue<u32> = FixedQueue::with_capacity(4);
        let mut expected = 0;
        for lap in 0..10 {
            for v in 0..3 {
                q.push(lap * 3 + v).unwrap();
            }
            for _ in 0..3 {
                assert_eq!(q.pop(), Some(expected));
                expected += 1;
            }
        }
        assert!(q.is_empty());
    }

    #[test]
    fn iter_reflects_logical_order_across_wrap() {
        let mut q: FixedQueue<u32> = FixedQueue::with_capacity(4);
        for v in 0..4 {
            q.push(v).unwrap();
        }
        q.pop();
        q.pop();
        q.push(4).unwrap();
        q.push(5).unwrap();

        // Physically wrapped; logically 2, 3, 4, 5.
        let seen: Vec<u32> = q.iter().copied().collect();
        assert_eq!(seen, [2, 3, 4, 5]);
    }

    // ===== Capacity modes =====

    #[test]
    fn fixed_full_returns_value_without_state_change() {
        let mut q: FixedQueue<u32> = FixedQueue::with_capacity(2);
        q.push(1).unwrap();
        q.push(2).unwrap();

        let err = q.push(3).unwrap_err();
        assert_eq!(err.into_inner(), 3);
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek(), Some(&1));
    }

    #[test]
    fn growth_relinearizes_wrapped_queue() {
        let mut q: DynamicQueue<u32> = DynamicQueue::with_capacity(4);
        for v in 0..4 {
            q.push(v).unwrap();
        }
        assert_eq!(q.pop(), Some(0));
        assert_eq!(q.pop(), Some(1));
        q.push(4).unwrap();
        q.push(5).unwrap();
        // Full and physically wrapped; the next push grows.
        q.push(6).unwrap();

        assert_eq!(q.capacity(), 8);
        let seen: Vec<u32> = q.iter().copied().collect();
        assert_eq!(seen, [2, 3, 4, 5, 6]);
        for expected in 2..=6 {
            assert_eq!(q.pop(), Some(expected));
        }
    }

    // ===== Element lifetime =====

    #[test]
    fn drop_cleans_up_wrapped_elements() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Droppable;
        impl Drop for Droppable {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let mut q: FixedQueue<Droppable> = FixedQueue::with_capacity(4);
            for _ in 0..4 {
                q.push(Droppable).unwrap();
            }
            drop(q.pop());
            drop(q.pop());
            q.push(Droppable).unwrap();
            // Three live elements straddle the physical boundary.
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);
        }
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut q: DynamicQueue<u32> = DynamicQueue::with_capacity(4);
        q.push(1).unwrap();
        q.push(2).unwrap();

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);

        q.clear();
        assert!(q.is_empty());
    }

    // ===== Property tests =====

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn behaves_like_vecdeque(ops in proptest::collection::vec(any::<Option<u16>>(), 0..200)) {
            let mut q: DynamicQueue<u16> = DynamicQueue::with_capacity(2);
            let mut oracle = std::collections::VecDeque::new();

            // Some(v) pushes, None pops; growth and wraparound fall out
            // of the interleaving.
            for op in ops {
                match op {
                    Some(v) => {
                        q.push(v).unwrap();
                        oracle.push_back(v);
                    }
                    None => {
                        prop_assert_eq!(q.pop(), oracle.pop_front());
                    }
                }
                prop_assert_eq!(q.len(), oracle.len());
                prop_assert_eq!(q.peek(), oracle.front());
            }

            let drained: Vec<u16> = std::iter::from_fn(|| q.pop()).collect();
            let expected: Vec<u16> = oracle.into_iter().collect();
            prop_assert_eq!(drained, expected);
        }
    }
}
