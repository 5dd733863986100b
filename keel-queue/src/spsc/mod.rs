//! Single-producer single-consumer (SPSC) bounded queue.
//!
//! The fastest queue variant: no compare-and-swap anywhere, and the hot
//! path runs on cached counters with zero atomic loads.
//!
//! # Example
//!
//! ```
//! use keel_queue::spsc;
//!
//! let (mut tx, mut rx) = spsc::queue::<u64>(1024);
//!
//! tx.try_push(1).unwrap();
//! tx.try_push(2).unwrap();
//!
//! assert_eq!(rx.try_pop().unwrap(), 1);
//! assert_eq!(rx.try_pop().unwrap(), 2);
//! ```
//!
//! # Disconnection
//!
//! When either the [`Producer`] or [`Consumer`] is dropped, the queue
//! becomes disconnected. The remaining endpoint observes this on its
//! slow path, where it can no longer make progress:
//!
//! - [`Producer::try_push`] returns [`TryPushError::Disconnected`] once the
//!   consumer is gone AND the queue is full; pushes that still fit succeed
//!   and are dropped with the queue
//! - [`Consumer::try_pop`] returns [`TryPopError::Disconnected`] once the
//!   producer is gone AND the queue is drained
//!
//! # Blocking
//!
//! [`Producer::push`] and [`Consumer::pop`] retry with a spin-then-yield
//! backoff. They never park the thread or touch the kernel, so they are
//! safe on latency-critical threads but will burn a core if the peer
//! stalls for long.
//!
//! # Performance Notes
//!
//! When the queue is neither full nor empty an operation performs no
//! atomic loads at all: each endpoint trusts its cached copy of the
//! peer's counter and refreshes it once only when the queue looks
//! full/empty. Publishing is a single release store.

mod ring;

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crossbeam_utils::Backoff;

use ring::RingBuffer;

/// Creates a new SPSC queue with the given capacity.
///
/// The actual capacity is rounded up to the next power of two (minimum 2)
/// for efficient index masking.
///
/// # Example
///
/// ```
/// use keel_queue::spsc;
///
/// let (tx, rx) = spsc::queue::<String>(100);
/// // Actual capacity will be 128 (next power of two)
/// assert_eq!(tx.capacity(), 128);
/// ```
pub fn queue<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let inner = RingBuffer::<T>::allocate(capacity);

    (
        Producer {
            inner,
            local_tail: 0,
            cached_head: 0,
        },
        Consumer {
            inner,
            local_head: 0,
            cached_tail: 0,
        },
    )
}

/// The producing half of an SPSC queue.
///
/// Owned by one thread at a time (`Send` but not `Sync`).
pub struct Producer<T> {
    inner: NonNull<RingBuffer<T>>,

    /// Our write position. Authoritative, only we advance it.
    local_tail: usize,
    /// Snapshot of the consumer's read position, refreshed only when the
    /// queue appears full.
    cached_head: usize,
}

// Safety: the producer can move to another thread but never be shared.
// The ring buffer synchronizes the counter hand-off.
unsafe impl<T: Send> Send for Producer<T> {}

impl<T> Producer<T> {
    /// Attempts to push a value into the queue.
    ///
    /// # Errors
    ///
    /// Returns `Err(TryPushError::Full(value))` if the queue is full, with
    /// no state changed. Returns `Err(TryPushError::Disconnected(value))`
    /// if the consumer has been dropped and no slot is left: pushes that
    /// still fit are accepted, and those values are dropped with the
    /// queue.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_queue::spsc::{self, TryPushError};
    ///
    /// let (mut tx, rx) = spsc::queue::<u32>(2);
    ///
    /// assert!(tx.try_push(1).is_ok());
    /// assert!(tx.try_push(2).is_ok());
    ///
    /// // Queue is now full
    /// assert!(matches!(tx.try_push(3), Err(TryPushError::Full(3))));
    /// ```
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), TryPushError<T>> {
        let inner = unsafe { self.inner.as_ref() };
        let tail = self.local_tail;

        // Fast path: trust the cached head, no atomic load.
        if tail.wrapping_sub(self.cached_head) < inner.capacity() {
            unsafe { inner.write_slot(tail, value) };
            inner.publish_tail(tail.wrapping_add(1));
            self.local_tail = tail.wrapping_add(1);
            return Ok(());
        }

        self.try_push_slow(tail, value)
    }

    #[cold]
    fn try_push_slow(&mut self, tail: usize, value: T) -> Result<(), TryPushError<T>> {
        let inner = unsafe { self.inner.as_ref() };

        // Refresh the cached head once.
        let head = inner.load_head();
        self.cached_head = head;

        if tail.wrapping_sub(head) < inner.capacity() {
            unsafe { inner.write_slot(tail, value) };
            inner.publish_tail(tail.wrapping_add(1));
            self.local_tail = tail.wrapping_add(1);
            return Ok(());
        }

        // Truly full. A dropped consumer will never free a slot.
        if inner.is_consumer_disconnected() {
            return Err(TryPushError::Disconnected(value));
        }

        Err(TryPushError::Full(value))
    }

    /// Pushes a value, spinning until space appears.
    ///
    /// Backs off with a spin-then-yield loop; the thread is never parked.
    ///
    /// # Errors
    ///
    /// Returns `Err(PushError(value))` if the consumer has disconnected
    /// and no slot is left for the value.
    pub fn push(&mut self, value: T) -> Result<(), PushError<T>> {
        let backoff = Backoff::new();
        let mut value = value;

        loop {
            match self.try_push(value) {
                Ok(()) => return Ok(()),
                Err(TryPushError::Full(v)) => {
                    value = v;
                    backoff.snooze();
                }
                Err(TryPushError::Disconnected(v)) => return Err(PushError(v)),
            }
        }
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { self.inner.as_ref().capacity() }
    }

    /// Returns `true` if the consumer has been dropped.
    ///
    /// May be stale: the consumer can disconnect right after this
    /// returns `false`.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        unsafe { self.inner.as_ref().is_consumer_disconnected() }
    }

    /// Returns the number of queued elements.
    ///
    /// A snapshot; it can be stale the instant it is read.
    #[inline]
    pub fn len(&self) -> usize {
        let inner = unsafe { self.inner.as_ref() };
        inner.load_tail().wrapping_sub(inner.load_head())
    }

    /// Returns `true` if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        unsafe {
            self.inner.as_ref().set_producer_disconnected();
            RingBuffer::release(self.inner);
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("disconnected", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

/// The consuming half of an SPSC queue.
///
/// Owned by one thread at a time (`Send` but not `Sync`).
pub struct Consumer<T> {
    inner: NonNull<RingBuffer<T>>,

    /// Our read position. Authoritative, only we advance it.
    local_head: usize,
    /// Snapshot of the producer's write position, refreshed only when the
    /// queue appears empty.
    cached_tail: usize,
}

// Safety: the consumer can move to another thread but never be shared.
// The ring buffer synchronizes the counter hand-off.
unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Attempts to pop the front value from the queue.
    ///
    /// # Errors
    ///
    /// Returns `Err(TryPopError::Empty)` if the queue is empty, with no
    /// state changed. Returns `Err(TryPopError::Disconnected)` if the
    /// producer has been dropped AND the queue is drained.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_queue::spsc::{self, TryPopError};
    ///
    /// let (mut tx, mut rx) = spsc::queue::<u32>(8);
    ///
    /// // Queue is empty
    /// assert!(matches!(rx.try_pop(), Err(TryPopError::Empty)));
    ///
    /// tx.try_push(42).unwrap();
    /// assert_eq!(rx.try_pop().unwrap(), 42);
    /// ```
    #[inline]
    pub fn try_pop(&mut self) -> Result<T, TryPopError> {
        let head = self.local_head;

        // Fast path: trust the cached tail, no atomic load.
        if head != self.cached_tail {
            let inner = unsafe { self.inner.as_ref() };
            let value = unsafe { inner.read_slot(head) };
            inner.publish_head(head.wrapping_add(1));
            self.local_head = head.wrapping_add(1);
            return Ok(value);
        }

        self.try_pop_slow(head)
    }

    #[cold]
    fn try_pop_slow(&mut self, head: usize) -> Result<T, TryPopError> {
        let inner = unsafe { self.inner.as_ref() };

        // Refresh the cached tail once.
        let tail = inner.load_tail();
        self.cached_tail = tail;

        if head != tail {
            let value = unsafe { inner.read_slot(head) };
            inner.publish_head(head.wrapping_add(1));
            self.local_head = head.wrapping_add(1);
            return Ok(value);
        }

        if inner.is_producer_disconnected() {
            return Err(TryPopError::Disconnected);
        }

        Err(TryPopError::Empty)
    }

    /// Pops a value, spinning until one appears.
    ///
    /// Backs off with a spin-then-yield loop; the thread is never parked.
    ///
    /// # Errors
    ///
    /// Returns `Err(PopError)` if the producer disconnects and the queue
    /// is drained.
    pub fn pop(&mut self) -> Result<T, PopError> {
        let backoff = Backoff::new();

        loop {
            match self.try_pop() {
                Ok(value) => return Ok(value),
                Err(TryPopError::Empty) => backoff.snooze(),
                Err(TryPopError::Disconnected) => return Err(PopError),
            }
        }
    }

    /// Borrows the front value without consuming it.
    ///
    /// The borrow keeps the queue pinned: popping needs `&mut self`, so
    /// the slot cannot be recycled while the reference lives.
    ///
    /// # Errors
    ///
    /// Same conditions as [`try_pop`](Self::try_pop).
    pub fn try_peek(&self) -> Result<&T, TryPopError> {
        let inner = unsafe { self.inner.as_ref() };
        let head = self.local_head;

        if head == self.cached_tail && head == inner.load_tail() {
            if inner.is_producer_disconnected() {
                return Err(TryPopError::Disconnected);
            }
            return Err(TryPopError::Empty);
        }

        Ok(unsafe { inner.peek_slot(head) })
    }

    /// Returns an iterator over the queued elements in logical order.
    ///
    /// The range is snapshotted at creation: elements pushed afterwards
    /// are not yielded. Nothing is consumed; popping is ruled out for the
    /// iterator's lifetime because it borrows the consumer.
    pub fn iter(&self) -> Iter<'_, T> {
        let inner = unsafe { self.inner.as_ref() };
        Iter {
            ring: inner,
            head: self.local_head,
            tail: inner.load_tail(),
            _marker: PhantomData,
        }
    }

    /// Pops and drops every queued element.
    ///
    /// Leaves the logical count at 0; calling it again is a no-op.
    pub fn clear(&mut self) {
        while let Ok(value) = self.try_pop() {
            drop(value);
        }
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { self.inner.as_ref().capacity() }
    }

    /// Returns `true` if the producer has been dropped.
    ///
    /// May be stale: the producer can disconnect right after this
    /// returns `false`.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        unsafe { self.inner.as_ref().is_producer_disconnected() }
    }

    /// Returns the number of queued elements.
    ///
    /// A snapshot; it can be stale the instant it is read.
    #[inline]
    pub fn len(&self) -> usize {
        let inner = unsafe { self.inner.as_ref() };
        inner.load_tail().wrapping_sub(inner.load_head())
    }

    /// Returns `true` if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        unsafe {
            self.inner.as_ref().set_consumer_disconnected();
            RingBuffer::release(self.inner);
        }
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("disconnected", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

impl<'a, T> IntoIterator for &'a Consumer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Iterator over the queued elements, front to back.
///
/// Created by [`Consumer::iter`].
pub struct Iter<'a, T> {
    ring: &'a RingBuffer<T>,
    head: usize,
    tail: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.head == self.tail {
            return None;
        }
        let item = unsafe { self.ring.peek_slot(self.head) };
        self.head = self.head.wrapping_add(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tail.wrapping_sub(self.head);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Error returned by [`Producer::try_push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPushError<T> {
    /// The queue is full. Contains the value that could not be pushed.
    Full(T),
    /// The consumer has been dropped. Contains the value that could not
    /// be pushed.
    Disconnected(T),
}

impl<T> TryPushError<T> {
    /// Returns the value that could not be pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Disconnected(value) => value,
        }
    }

    /// Returns `true` if this error is the `Full` variant.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Returns `true` if this error is the `Disconnected` variant.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "queue is full"),
            Self::Disconnected(_) => write!(f, "consumer disconnected"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TryPushError<T> {}

/// Error returned by [`Consumer::try_pop`] and [`Consumer::try_peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPopError {
    /// The queue is empty.
    Empty,
    /// The producer has been dropped and the queue is drained.
    Disconnected,
}

impl TryPopError {
    /// Returns `true` if this error is the `Empty` variant.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if this error is the `Disconnected` variant.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for TryPopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "queue is empty"),
            Self::Disconnected => write!(f, "producer disconnected"),
        }
    }
}

impl std::error::Error for TryPopError {}

/// Error returned by [`Producer::push`] when the consumer disconnects.
///
/// Contains the value that could not be pushed, allowing recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Returns the value that could not be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer disconnected")
    }
}

impl<T: fmt::Debug> std::error::Error for PushError<T> {}

/// Error returned by [`Consumer::pop`] when the producer disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopError;

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "producer disconnected")
    }
}

impl std::error::Error for PopError {}
