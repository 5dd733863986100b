//! Raw typed memory regions.
//!
//! [`RawBuffer`] is the allocation primitive every container in this
//! workspace builds on: a typed pointer, a slot count, and an ownership
//! flag. It knows nothing about element liveness. The owning container
//! decides which slots hold initialized values and is responsible for
//! dropping them; the buffer only allocates, frees, copies, and addresses.
//!
//! # Ownership
//!
//! A buffer is created in one of two ways:
//!
//! - [`RawBuffer::alloc_zeroed`] allocates its own zeroed region and frees
//!   it on drop (`owned = true`). Only these buffers can [`grow`].
//! - [`RawBuffer::from_raw_parts`] adopts a region carved out of a larger
//!   allocation (`owned = false`). Drop is a no-op; the memory is released
//!   when the enclosing allocation is.
//!
//! # Example
//!
//! ```
//! use keel_buffer::RawBuffer;
//!
//! let mut buf: RawBuffer<u64> = RawBuffer::alloc_zeroed(8);
//! assert_eq!(buf.len(), 8);
//!
//! // Slots start zeroed.
//! assert_eq!(unsafe { buf.read(3) }, 0);
//!
//! unsafe { buf.write(3, 42) };
//! assert_eq!(unsafe { buf.read(3) }, 42);
//! ```

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::mem;
use std::ptr;
use std::ptr::NonNull;

/// A typed memory region addressed by slot index.
///
/// The stride of a slot is `size_of::<T>()` and the region is aligned to
/// `align_of::<T>()`. No slot is assumed initialized: all element access
/// goes through unsafe accessors whose preconditions the caller upholds.
/// Bounds are checked with `debug_assert!` only; release builds trade the
/// checks for speed, which is the reason containers sit on top of this
/// type rather than using it directly.
pub struct RawBuffer<T> {
    ptr: NonNull<T>,
    len: usize,
    owned: bool,
}

impl<T> RawBuffer<T> {
    fn layout_for(len: usize) -> Layout {
        Layout::array::<T>(len).expect("capacity too large")
    }

    /// Allocates an owned, zero-initialized buffer of `len` slots.
    ///
    /// Zero-size layouts (`len == 0` or zero-sized `T`) do not touch the
    /// allocator and use a dangling, well-aligned pointer.
    ///
    /// # Panics
    ///
    /// Panics if the total size overflows `isize`. Aborts via
    /// `handle_alloc_error` if the allocator fails.
    pub fn alloc_zeroed(len: usize) -> Self {
        let layout = Self::layout_for(len);
        if layout.size() == 0 {
            return Self {
                ptr: NonNull::dangling(),
                len,
                owned: true,
            };
        }

        let ptr = unsafe { alloc_zeroed(layout) } as *mut T;
        if ptr.is_null() {
            handle_alloc_error(layout);
        }
        let ptr = unsafe { NonNull::new_unchecked(ptr) };

        Self {
            ptr,
            len,
            owned: true,
        }
    }

    /// Adopts `len` slots of externally owned memory.
    ///
    /// The resulting buffer never deallocates: the region is freed as part
    /// of whatever allocation it was carved from.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned to `align_of::<T>()` and point to at least
    /// `len * size_of::<T>()` bytes that stay valid for the buffer's
    /// lifetime. The buffer must not outlive the enclosing allocation.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        debug_assert!(
            ptr.as_ptr() as usize % mem::align_of::<T>() == 0,
            "pointer not aligned for element type"
        );
        Self {
            ptr,
            len,
            owned: false,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer has no slots.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the buffer owns (and will free) its region.
    #[inline]
    pub const fn is_owned(&self) -> bool {
        self.owned
    }

    /// Returns the base pointer of the region.
    #[inline]
    pub const fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Grows an owned buffer to `new_len` slots.
    ///
    /// Existing slots are moved bitwise into the new region and the tail
    /// is zeroed. Element liveness is unchanged: nothing is dropped, the
    /// old region is only freed.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is a fixed view (`owned = false`); growing
    /// borrowed memory is a programming error, not a recoverable state.
    pub fn grow(&mut self, new_len: usize) {
        assert!(self.owned, "cannot grow a fixed buffer");
        debug_assert!(new_len >= self.len);

        let mut grown = Self::alloc_zeroed(new_len);
        if mem::size_of::<T>() != 0 && self.len != 0 {
            unsafe {
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), grown.ptr.as_ptr(), self.len);
            }
        }
        // The old region is freed when `grown` drops.
        mem::swap(self, &mut grown);
    }

    /// Copies `count` slots from `src` into this buffer.
    ///
    /// # Safety
    ///
    /// Both ranges must be in bounds, the source range must hold
    /// initialized or otherwise byte-copyable slots for the destination's
    /// use, and the two buffers must not overlap.
    pub unsafe fn copy_from(
        &mut self,
        dst_index: usize,
        src: &RawBuffer<T>,
        src_index: usize,
        count: usize,
    ) {
        debug_assert!(dst_index + count <= self.len);
        debug_assert!(src_index + count <= src.len);
        debug_assert!(
            !ptr::eq(self.ptr.as_ptr(), src.ptr.as_ptr()),
            "copy_from requires distinct buffers"
        );
        unsafe {
            ptr::copy_nonoverlapping(
                src.ptr.as_ptr().add(src_index),
                self.ptr.as_ptr().add(dst_index),
                count,
            );
        }
    }

    /// Shifts `count` slots from `from` to `to` within this buffer.
    ///
    /// The ranges may overlap (`ptr::copy` semantics). This is the
    /// primitive behind element removal and insertion in [`List`].
    ///
    /// [`List`]: crate::List
    ///
    /// # Safety
    ///
    /// Both ranges must be in bounds. Slots vacated by the shift keep
    /// their old bytes; the caller tracks which copies are live.
    pub unsafe fn copy_within(&mut self, from: usize, to: usize, count: usize) {
        debug_assert!(from + count <= self.len);
        debug_assert!(to + count <= self.len);
        unsafe {
            ptr::copy(self.ptr.as_ptr().add(from), self.ptr.as_ptr().add(to), count);
        }
    }

    /// Zero-fills `count` slots starting at `index`.
    ///
    /// # Safety
    ///
    /// The range must be in bounds and the caller must treat any live
    /// elements in it as gone without drop.
    pub unsafe fn zero(&mut self, index: usize, count: usize) {
        debug_assert!(index + count <= self.len);
        unsafe {
            ptr::write_bytes(self.ptr.as_ptr().add(index), 0, count);
        }
    }

    /// Scans `[start, end)` forward for the first slot equal to `needle`.
    ///
    /// # Safety
    ///
    /// Every slot in the range must hold an initialized value.
    pub unsafe fn index_of(&self, needle: &T, start: usize, end: usize) -> Option<usize>
    where
        T: PartialEq,
    {
        debug_assert!(start <= end && end <= self.len);
        for i in start..end {
            if unsafe { &*self.ptr.as_ptr().add(i) } == needle {
                return Some(i);
            }
        }
        None
    }

    /// Scans `[start, end)` backward for the last slot equal to `needle`.
    ///
    /// # Safety
    ///
    /// Every slot in the range must hold an initialized value.
    pub unsafe fn last_index_of(&self, needle: &T, start: usize, end: usize) -> Option<usize>
    where
        T: PartialEq,
    {
        debug_assert!(start <= end && end <= self.len);
        for i in (start..end).rev() {
            if unsafe { &*self.ptr.as_ptr().add(i) } == needle {
                return Some(i);
            }
        }
        None
    }

    /// Returns a raw pointer to slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds.
    #[inline]
    pub unsafe fn slot_ptr(&self, index: usize) -> *mut T {
        debug_assert!(index < self.len);
        unsafe { self.ptr.as_ptr().add(index) }
    }

    /// Returns a reference to the value in slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds and the slot must hold an initialized
    /// value.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// Returns a mutable reference to the value in slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds and the slot must hold an initialized
    /// value.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }

    /// Moves the value out of slot `index` without marking it gone.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds and the slot must hold an initialized
    /// value. The caller must not read the slot again (other than to
    /// overwrite it) unless `T: Copy`.
    #[inline]
    pub unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.len);
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// Writes `value` into slot `index` without dropping the old bytes.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds. Any live value already in the slot
    /// is overwritten without drop.
    #[inline]
    pub unsafe fn write(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len);
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        let layout = Self::layout_for(self.len);
        if layout.size() != 0 {
            unsafe {
                dealloc(self.ptr.as_ptr() as *mut u8, layout);
            }
        }
    }
}

// Safety: the buffer is plain memory; element access goes through unsafe
// accessors whose aliasing discipline the caller upholds.
unsafe impl<T: Send> Send for RawBuffer<T> {}
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

impl<T> fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len", &self.len)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}
