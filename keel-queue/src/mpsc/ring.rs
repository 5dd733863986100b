//! The shared storage behind an MPSC queue.
//!
//! Per-slot sequence numbers coordinate multiple producers and tolerate
//! out-of-order completion: a slot hands itself from producers to the
//! consumer and back without any lock.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};
use keel_buffer::RawBuffer;

/// A slot in the sequenced ring buffer.
///
/// The sequence number encodes the slot's state:
/// - `sequence == index`: slot is empty, writable
/// - `sequence == index + 1`: slot holds data, readable
/// - `sequence == index + capacity`: slot recycled, writable next lap
#[repr(C)]
pub struct Slot<T> {
    sequence: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// The backing storage for an MPSC queue.
///
/// Memory layout:
/// ```text
/// ┌───────────────────────────────────────────────────────┐
/// │ ref_count, mask, layout, slots view                   │
/// │ producer_count, consumer_disconnected                 │
/// ├───────────────────────────────────────────────────────┤
/// │ tail (cache-line padded) - producer claim position    │
/// ├───────────────────────────────────────────────────────┤
/// │ head (cache-line padded) - consumer read position     │
/// ├───────────────────────────────────────────────────────┤
/// │ Slot[0]: { sequence, data }                           │
/// │ Slot[1]: { sequence, data }                           │
/// │ ...                                                   │
/// └───────────────────────────────────────────────────────┘
/// ```
///
/// Header and slot region are one contiguous allocation; the header
/// addresses the slots through a fixed [`RawBuffer`] carved from the
/// same block.
#[repr(C)]
pub struct RingBuffer<T> {
    ref_count: AtomicUsize,

    // === Immutable configuration ===
    mask: usize,
    layout: Layout,
    slots: RawBuffer<Slot<T>>,

    // === Liveness tracking ===
    /// Number of producers alive. When 0, every producer disconnected.
    producer_count: AtomicUsize,
    /// Set when the consumer is dropped.
    consumer_disconnected: AtomicBool,

    // === Cache-line padded counters ===
    /// Next slot for producers to claim (via CAS).
    tail: CachePadded<AtomicUsize>,
    /// Consumer read position. Only synced when the consumer drops; the
    /// live protocol runs on per-slot sequences instead.
    head: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Computes the layout of the header plus `capacity` slots.
    fn layout_for(capacity: usize) -> (Layout, usize) {
        let header = Layout::new::<Self>();
        let slots = Layout::array::<Slot<T>>(capacity).expect("capacity too large");
        let (layout, slots_offset) = header.extend(slots).expect("layout overflow");
        (layout.pad_to_align(), slots_offset)
    }

    /// Allocates and initializes a new ring buffer.
    ///
    /// The capacity is rounded up to the next power of two (minimum 2).
    /// Initial reference count is 2 (one producer plus the consumer).
    pub fn allocate(capacity: usize) -> NonNull<Self> {
        let capacity = capacity.next_power_of_two().max(2);
        let (layout, slots_offset) = Self::layout_for(capacity);

        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        let slots = unsafe { NonNull::new_unchecked(ptr.add(slots_offset).cast::<Slot<T>>()) };
        let rb = ptr.cast::<Self>();

        unsafe {
            ptr::write(
                rb,
                Self {
                    ref_count: AtomicUsize::new(2),
                    mask: capacity - 1,
                    layout,
                    slots: RawBuffer::from_raw_parts(slots, capacity),
                    producer_count: AtomicUsize::new(1),
                    consumer_disconnected: AtomicBool::new(false),
                    tail: CachePadded::new(AtomicUsize::new(0)),
                    head: CachePadded::new(AtomicUsize::new(0)),
                },
            );

            // Arm every slot as empty: sequence == index.
            for i in 0..capacity {
                slots.as_ptr().add(i).write(Slot {
                    sequence: AtomicUsize::new(i),
                    data: UnsafeCell::new(MaybeUninit::uninit()),
                });
            }

            NonNull::new_unchecked(rb)
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T> {
        unsafe { self.slots.get_unchecked(index & self.mask) }
    }

    /// Returns the capacity of the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    // === Producer operations ===

    /// Attempts to claim a slot for writing.
    ///
    /// Returns `Some(index)` if a slot was claimed, `None` if the queue
    /// is full.
    #[inline]
    pub fn try_claim(&self) -> Option<usize> {
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(tail);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - tail as isize;

            if diff == 0 {
                // Slot is writable, try to claim it.
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some(tail),
                    Err(t) => {
                        // Lost the race. Retry with backoff.
                        return self.try_claim_contended(t);
                    }
                }
            } else if diff < 0 {
                // Slot not yet recycled by the consumer: queue is full.
                return None;
            } else {
                // Another producer claimed this slot, reload the tail.
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    #[cold]
    fn try_claim_contended(&self, mut tail: usize) -> Option<usize> {
        let backoff = Backoff::new();

        loop {
            let slot = self.slot(tail);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - tail as isize;

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some(tail),
                    Err(t) => {
                        tail = t;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                return None;
            } else {
                tail = self.tail.load(Ordering::Relaxed);
                backoff.spin();
            }
        }
    }

    /// Writes a value into a claimed slot.
    ///
    /// # Safety
    ///
    /// `index` must come from a successful [`try_claim`](Self::try_claim),
    /// and this must be called exactly once per claim.
    #[inline]
    pub unsafe fn write_slot(&self, index: usize, value: T) {
        let slot = self.slot(index);
        unsafe {
            ptr::write((*slot.data.get()).as_mut_ptr(), value);
        }
    }

    /// Publishes a written slot, making it readable by the consumer.
    ///
    /// # Safety
    ///
    /// Must be called after [`write_slot`](Self::write_slot) for the same
    /// index.
    #[inline]
    pub unsafe fn publish(&self, index: usize) {
        let slot = self.slot(index);
        // sequence == index + 1 signals "readable".
        slot.sequence
            .store(index.wrapping_add(1), Ordering::Release);
    }

    // === Consumer operations ===

    /// Attempts to read the slot at `head`.
    ///
    /// Returns `Some(value)` if the slot was published, `None` otherwise.
    ///
    /// # Safety
    ///
    /// Must only be called from the single consumer.
    #[inline]
    pub unsafe fn try_read(&self, head: usize) -> Option<T> {
        let slot = self.slot(head);
        let seq = slot.sequence.load(Ordering::Acquire);

        if seq == head.wrapping_add(1) {
            let value = unsafe { ptr::read((*slot.data.get()).as_ptr()) };

            // Recycle the slot for the next lap.
            slot.sequence
                .store(head.wrapping_add(self.capacity()), Ordering::Release);

            Some(value)
        } else {
            None
        }
    }

    /// Borrows the slot at `head` without consuming it.
    ///
    /// Returns `Some(&value)` if the slot was published, `None` otherwise.
    ///
    /// # Safety
    ///
    /// Must only be called from the single consumer, and the slot must
    /// stay unconsumed for the lifetime of the reference.
    #[inline]
    pub unsafe fn peek_slot(&self, head: usize) -> Option<&T> {
        let slot = self.slot(head);
        let seq = slot.sequence.load(Ordering::Acquire);

        if seq == head.wrapping_add(1) {
            Some(unsafe { &*(*slot.data.get()).as_ptr() })
        } else {
            None
        }
    }

    /// Loads the current producer claim position.
    #[inline]
    pub fn load_tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    /// Stores the consumer read position (used only at consumer drop).
    #[inline]
    pub fn store_head(&self, head: usize) {
        self.head.store(head, Ordering::Relaxed);
    }

    // === Liveness ===

    #[inline]
    pub fn add_producer(&self) {
        self.producer_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn remove_producer(&self) -> usize {
        self.producer_count.fetch_sub(1, Ordering::AcqRel)
    }

    #[inline]
    pub fn producer_count(&self) -> usize {
        self.producer_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_consumer_disconnected(&self) -> bool {
        self.consumer_disconnected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_consumer_disconnected(&self) {
        self.consumer_disconnected.store(true, Ordering::Release);
    }

    // === Lifecycle ===

    /// Increments the reference count (a producer was cloned).
    pub fn acquire(this: NonNull<Self>) {
        unsafe {
            this.as_ref().ref_count.fetch_add(1, Ordering::Relaxed);
        }
    }

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

    /// Drops every published element still queued.
    ///
    /// # Safety
    ///
    /// Must only be called during deallocation, when this thread is the
    /// sole accessor.
    unsafe fn drop_remaining_elements(this: NonNull<Self>) {
        let inner = unsafe { this.as_ref() };
        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Relaxed);

        // Walk [head, tail) and drop only slots whose sequence shows a
        // completed write; claimed-but-unpublished slots hold no value.
        for i in head..tail {
            let slot = inner.slot(i);
            let seq = slot.sequence.load(Ordering::Relaxed);

            if seq == i.wrapping_add(1) {
                unsafe {
                    ptr::drop_in_place((*slot.data.get()).as_mut_ptr());
                }
            }
        }
    }
}
