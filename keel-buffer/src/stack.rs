//! LIFO stack.

use std::fmt;
use std::ptr;
use std::slice;

use crate::raw::RawBuffer;
use crate::{Full, DYNAMIC, FIXED};

/// A last-in-first-out stack over a [`RawBuffer`].
///
/// Same capacity modes as [`List`](crate::List): fixed stacks report
/// [`Full`], dynamic stacks double.
pub struct Stack<T, const MODE: bool> {
    buf: RawBuffer<T>,
    len: usize,
}

/// Type alias for a fixed-capacity stack.
pub type FixedStack<T> = Stack<T, FIXED>;

/// Type alias for a growable stack.
pub type DynamicStack<T> = Stack<T, DYNAMIC>;

impl<T, const MODE: bool> Stack<T, MODE> {
    /// Creates a stack with room for `capacity` elements.
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

    /// Returns `true` if the stack holds no elements.
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

    /// Pushes `value` onto the top of the stack.
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        if self.len == self.buf.len() {
            if MODE == FIXED {
                return Err(Full(value));
            }
            let new_cap = self.buf.len() * 2;
            self.buf.grow(new_cap);
        }
        // Safety: len < capacity after the check above.
        unsafe { self.buf.write(self.len, value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the top element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: slot was live before the decrement.
        Some(unsafe { self.buf.read(self.len) })
    }

    /// Returns a reference to the top element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        // Safety: top slot is live.
        Some(unsafe { self.buf.get_unchecked(self.len - 1) })
    }

    /// Returns a mutable reference to the top element.
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        if self.len == 0 {
            return None;
        }
        // Safety: top slot is live.
        Some(unsafe { self.buf.get_unchecked_mut(self.len - 1) })
    }

    /// Drops every element and resets the length to 0. Idempotent.
    pub fn clear(&mut self) {
        // Safety: [0, len) are live exactly once.
        unsafe {
            let live = slice::from_raw_parts_mut(self.buf.as_ptr(), self.len);
            self.len = 0;
            ptr::drop_in_place(live);
        }
    }
}

impl<T, const MODE: bool> Drop for Stack<T, MODE> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, const MODE: bool> fmt::Debug for Stack<T, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bottom first, top last.
        let live = unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) };
        f.debug_list().entries(live).finish()
    }
}
