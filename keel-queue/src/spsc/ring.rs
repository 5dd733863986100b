//! The shared storage behind an SPSC queue.
//!
//! Header and slot region live in one contiguous allocation. The header
//! addresses the slots through a fixed [`RawBuffer`] carved out of the
//! same block, so the buffer itself never allocates or frees anything.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use keel_buffer::RawBuffer;

/// The backing storage for an SPSC queue.
///
/// Memory layout:
/// ```text
/// ┌───────────────────────────────────────────────────────┐
/// │ head (cache-line padded) - consumer read position     │
/// ├───────────────────────────────────────────────────────┤
/// │ tail (cache-line padded) - producer write position    │
/// ├───────────────────────────────────────────────────────┤
/// │ slots view, mask, layout, ref_count, disconnect flags │
/// ├───────────────────────────────────────────────────────┤
/// │ Slot[0], Slot[1], ... Slot[capacity - 1]              │
/// └───────────────────────────────────────────────────────┘
/// ```
///
/// The queue holds elements in `[head, tail)`. Both counters run
/// monotonically and are reduced modulo capacity only when a slot is
/// addressed, so `tail - head` is the element count even across
/// wraparound.
#[repr(C)]
pub struct RingBuffer<T> {
    /// Consumer's read position. Written by the consumer, read by the
    /// producer when its cached copy looks full.
    head: CachePadded<AtomicUsize>,
    /// Producer's write position. Written by the producer, read by the
    /// consumer when its cached copy looks empty.
    tail: CachePadded<AtomicUsize>,

    /// Fixed view of the slot region at the end of this allocation.
    slots: RawBuffer<T>,
    mask: usize,
    /// Layout of the whole block, kept for deallocation.
    layout: Layout,

    ref_count: AtomicUsize,

    // Disconnect flags, only checked on the slow path.
    producer_disconnected: AtomicBool,
    consumer_disconnected: AtomicBool,
}

// Safety: the ring is shared between exactly two endpoints. All cross-thread
// hand-off goes through the acquire/release counter protocol.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Computes the layout of the header plus `capacity` slots.
    fn layout_for(capacity: usize) -> (Layout, usize) {
        let header = Layout::new::<Self>();
        let slots = Layout::array::<T>(capacity).expect("capacity too large");
        let (layout, slots_offset) = header.extend(slots).expect("layout overflow");
        (layout.pad_to_align(), slots_offset)
    }

    /// Allocates and initializes a new ring buffer.
    ///
    /// The capacity is rounded up to the next power of two (minimum 2).
    /// Initial reference count is 2, one per endpoint.
    pub fn allocate(capacity: usize) -> NonNull<Self> {
        let capacity = capacity.next_power_of_two().max(2);
        let (layout, slots_offset) = Self::layout_for(capacity);

        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        let slots = unsafe { NonNull::new_unchecked(ptr.add(slots_offset).cast::<T>()) };
        let rb = ptr.cast::<Self>();

        unsafe {
            ptr::write(
                rb,
                Self {
                    head: CachePadded::new(AtomicUsize::new(0)),
                    tail: CachePadded::new(AtomicUsize::new(0)),
                    slots: RawBuffer::from_raw_parts(slots, capacity),
                    mask: capacity - 1,
                    layout,
                    ref_count: AtomicUsize::new(2),
                    producer_disconnected: AtomicBool::new(false),
                    consumer_disconnected: AtomicBool::new(false),
                },
            );
            NonNull::new_unchecked(rb)
        }
    }

    /// Returns the capacity of the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    // === Counter operations ===

    /// Loads the consumer's published read position.
    #[inline]
    pub fn load_head(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    /// Loads the producer's published write position.
    #[inline]
    pub fn load_tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    /// Publishes a new read position after consuming a slot.
    #[inline]
    pub fn publish_head(&self, head: usize) {
        self.head.store(head, Ordering::Release);
    }

    /// Publishes a new write position after filling a slot.
    #[inline]
    pub fn publish_tail(&self, tail: usize) {
        self.tail.store(tail, Ordering::Release);
    }

    // === Slot operations ===

    /// Writes a value into the slot for `index` (masked internally).
    ///
    /// # Safety
    ///
    /// Only the producer may call this, and only for an index in its
    /// unpublished window `[tail, head + capacity)`.
    #[inline]
    pub unsafe fn write_slot(&self, index: usize, value: T) {
        unsafe { self.slots.slot_ptr(index & self.mask).write(value) }
    }

    /// Moves the value out of the slot for `index` (masked internally).
    ///
    /// # Safety
    ///
    /// Only the consumer may call this, and only for an index in the
    /// published window `[head, tail)`. The slot must not be read again.
    #[inline]
    pub unsafe fn read_slot(&self, index: usize) -> T {
        unsafe { self.slots.slot_ptr(index & self.mask).read() }
    }

    /// Borrows the value in the slot for `index` (masked internally).
    ///
    /// # Safety
    ///
    /// Only the consumer may call this, for an index in the published
    /// window `[head, tail)`, and the slot must stay unconsumed for the
    /// lifetime of the reference.
    #[inline]
    pub unsafe fn peek_slot(&self, index: usize) -> &T {
        unsafe { self.slots.get_unchecked(index & self.mask) }
    }

    // === Disconnect operations ===

    /// Returns `true` if the producer endpoint has been dropped.
    #[inline]
    pub fn is_producer_disconnected(&self) -> bool {
        self.producer_disconnected.load(Ordering::Relaxed)
    }

    /// Returns `true` if the consumer endpoint has been dropped.
    #[inline]
    pub fn is_consumer_disconnected(&self) -> bool {
        self.consumer_disconnected.load(Ordering::Relaxed)
    }

    /// Marks the producer endpoint as dropped.
    #[inline]
    pub fn set_producer_disconnected(&self) {
        self.producer_disconnected.store(true, Ordering::Release);
    }

    /// Marks the consumer endpoint as dropped.
    #[inline]
    pub fn set_consumer_disconnected(&self) {
        self.consumer_disconnected.store(true, Ordering::Release);
    }

    // === Lifecycle ===

    /// Decrements the reference count and deallocates at zero.
    ///
    /// # Safety
    ///
    /// Must only be called when an endpoint is dropped. The pointer must
    /// not be used after this call returns.
    pub unsafe fn release(this: NonNull<Self>) {
        let inner = unsafe { this.as_ref() };

        if inner.ref_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            unsafe {
                Self::drop_remaining_elements(this);
                let layout = inner.layout;
                ptr::drop_in_place(this.as_ptr());
                dealloc(this.as_ptr().cast(), layout);
            }
        }
    }

    /// Drops any elements still queued.
    ///
    /// # Safety
    ///
    /// Must only be called during deallocation, when this thread is the
    /// sole accessor.
    unsafe fn drop_remaining_elements(this: NonNull<Self>) {
        let inner = unsafe { this.as_ref() };

        // Relaxed is enough, the final release is the only accessor.
        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Relaxed);

        for i in head..tail {
            unsafe {
                ptr::drop_in_place(inner.slots.slot_ptr(i & inner.mask));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_and_release() {
        let rb = RingBuffer::<u64>::allocate(8);

        unsafe {
            assert_eq!(rb.as_ref().capacity(), 8);
            assert_eq!(rb.as_ref().mask, 7);
            assert!(!rb.as_ref().slots.is_owned());
        }

        // Both release calls must succeed without double-free.
        unsafe {
            RingBuffer::release(rb);
            RingBuffer::release(rb);
        }
    }

    #[test]
    fn slot_roundtrip_wraps_physical_index() {
        let rb = RingBuffer::<u64>::allocate(4);

        unsafe {
            let inner = rb.as_ref();

            // Logical index 6 lands in physical slot 2.
            inner.write_slot(6, 99);
            assert_eq!(*inner.peek_slot(6), 99);
            assert_eq!(inner.read_slot(2), 99);

            RingBuffer::release(rb);
            RingBuffer::release(rb);
        }
    }
}
