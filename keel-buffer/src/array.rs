//! Fixed-length, zero-initialized array.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice;

use crate::pod::Pod;
use crate::raw::RawBuffer;

/// A fixed-length array of plain-old-data elements.
///
/// Every slot is zero-initialized at construction, so the array is fully
/// usable immediately: the [`Pod`] bound guarantees that all-zeros is a
/// valid element and that discarding elements needs no drop glue. The
/// length never changes.
///
/// # Example
///
/// ```
/// use keel_buffer::Array;
///
/// let mut arr: Array<u32> = Array::new(8);
/// assert_eq!(arr[5], 0);
///
/// arr[5] = 99;
/// assert_eq!(arr.index_of(99), Some(5));
/// ```
pub struct Array<T: Pod> {
    buf: RawBuffer<T>,
}

impl<T: Pod> Array<T> {
    /// Allocates an array of `len` zeroed slots.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "capacity must be > 0");
        Self {
            buf: RawBuffer::alloc_zeroed(len),
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub const fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the array has no slots.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns a reference to the element at `index`, or `None` if out of
    /// bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.buf.len() {
            return None;
        }
        // Safety: in bounds, and every slot is initialized.
        Some(unsafe { self.buf.get_unchecked(index) })
    }

    /// Returns a mutable reference to the element at `index`, or `None` if
    /// out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.buf.len() {
            return None;
        }
        // Safety: in bounds, and every slot is initialized.
        Some(unsafe { self.buf.get_unchecked_mut(index) })
    }

    /// Writes `value` into slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.as_mut_slice()[index] = value;
    }

    /// Sets every slot to `value`.
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// Resets every slot to zero. Idempotent.
    pub fn clear(&mut self) {
        let len = self.buf.len();
        // Safety: full range; Pod elements have no drop glue to lose.
        unsafe { self.buf.zero(0, len) };
    }

    /// Returns the index of the first slot equal to `value`.
    pub fn index_of(&self, value: T) -> Option<usize>
    where
        T: PartialEq,
    {
        // Safety: every slot is initialized.
        unsafe { self.buf.index_of(&value, 0, self.buf.len()) }
    }

    /// Returns the index of the last slot equal to `value`.
    pub fn last_index_of(&self, value: T) -> Option<usize>
    where
        T: PartialEq,
    {
        // Safety: every slot is initialized.
        unsafe { self.buf.last_index_of(&value, 0, self.buf.len()) }
    }

    /// Returns the whole array as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // Safety: every slot is initialized for the array's lifetime.
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.buf.len()) }
    }

    /// Returns the whole array as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: every slot is initialized for the array's lifetime.
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.buf.len()) }
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: Pod> Index<usize> for Array<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Pod> IndexMut<usize> for Array<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let arr: Array<u64> = Array::new(16);
        assert_eq!(arr.len(), 16);
        assert!(arr.iter().all(|&v| v == 0));
    }

    #[test]
    fn set_get_roundtrip() {
        let mut arr: Array<u32> = Array::new(8);
        arr.set(3, 42);
        assert_eq!(arr.get(3), Some(&42));
        assert_eq!(arr[3], 42);
    }

    #[test]
    fn out_of_bounds_get_is_none() {
        let arr: Array<u32> = Array::new(4);
        assert_eq!(arr.get(4), None);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_index_panics() {
        let arr: Array<u32> = Array::new(4);
        let _ = arr[4];
    }

    #[test]
    fn fill_sets_every_slot() {
        let mut arr: Array<u16> = Array::new(8);
        arr.fill(7);
        assert!(arr.iter().all(|&v| v == 7));
    }

    #[test]
    fn clear_rezeroes_and_is_idempotent() {
        let mut arr: Array<u32> = Array::new(8);
        arr.fill(9);
        arr.clear();
        assert!(arr.iter().all(|&v| v == 0));
        arr.clear();
        assert!(arr.iter().all(|&v| v == 0));
    }

    #[test]
    fn scans_find_first_and_last() {
        let mut arr: Array<u32> = Array::new(6);
        arr.set(1, 5);
        arr.set(4, 5);
        assert_eq!(arr.index_of(5), Some(1));
        assert_eq!(arr.last_index_of(5), Some(4));
        assert_eq!(arr.index_of(6), None);
    }

    #[test]
    fn mutate_through_slice() {
        let mut arr: Array<u32> = Array::new(4);
        for (i, slot) in arr.as_mut_slice().iter_mut().enumerate() {
            *slot = i as u32 * 10;
        }
        assert_eq!(arr.as_slice(), &[0, 10, 20, 30]);
    }

    #[test]
    fn array_elements_start_zeroed() {
        let mut arr: Array<[u16; 4]> = Array::new(2);
        assert_eq!(arr[0], [0; 4]);
        assert_eq!(arr[1], [0; 4]);

        arr.set(1, [1, 2, 3, 4]);
        assert_eq!(arr.index_of([1, 2, 3, 4]), Some(1));
    }

    #[test]
    fn aggregate_pod_elements() {
        #[derive(Clone, Copy, PartialEq, Debug)]
        #[repr(C)]
        struct Vec2 {
            x: f32,
            y: f32,
        }
        // Safety: two zero floats form a valid Vec2.
        unsafe impl Pod for Vec2 {}

        let mut arr: Array<Vec2> = Array::new(3);
        assert_eq!(arr[0], Vec2 { x: 0.0, y: 0.0 });

        arr.fill(Vec2 { x: 1.0, y: 2.0 });
        assert_eq!(arr[2], Vec2 { x: 1.0, y: 2.0 });
    }
}
