//! Multi-producer single-consumer (MPSC) bounded queue.
//!
//! Any number of producers push concurrently; a single consumer pops.
//! Per-slot sequence numbers coordinate the producers, so a fast producer
//! is never blocked behind a slow one that claimed an earlier slot.
//!
//! # Example
//!
//! ```
//! use keel_queue::mpsc;
//! use std::thread;
//!
//! let (tx, mut rx) = mpsc::queue::<u64>(1024);
//!
//! // Clone the producer for a second thread
//! let tx2 = tx.clone();
//!
//! let h1 = thread::spawn(move || {
//!     for i in 0..100 {
//!         while tx.try_push(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let h2 = thread::spawn(move || {
//!     for i in 100..200 {
//!         while tx2.try_push(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut received = Vec::new();
//! while received.len() < 200 {
//!     if let Ok(val) = rx.try_pop() {
//!         received.push(val);
//!     }
//! }
//!
//! h1.join().unwrap();
//! h2.join().unwrap();
//!
//! assert_eq!(received.len(), 200);
//! ```
//!
//! # Ordering and Fairness
//!
//! Delivery order is slot-claim order: whichever producer wins the
//! claim for a slot delivers first, and the interleaving between
//! producers is unspecified. Producer-side fairness is not guaranteed
//! either: under sustained contention one producer can keep winning the
//! claim race while another retries indefinitely. That is an accepted
//! trade-off of the sequence protocol, not a bug.
//!
//! # Performance Notes
//!
//! Unlike SPSC, producers claim slots with an atomic compare-and-swap.
//! Out-of-order completion is supported: the consumer skips nothing but
//! waits only for the slot at its own read position.

mod ring;

use std::fmt;
use std::ptr::NonNull;

use crossbeam_utils::Backoff;

use ring::RingBuffer;

/// Creates a new MPSC queue with the given capacity.
///
/// The actual capacity is rounded up to the next power of two (minimum 2)
/// for efficient index masking.
///
/// # Example
///
/// ```
/// use keel_queue::mpsc;
///
/// let (tx, rx) = mpsc::queue::<String>(100);
/// // Actual capacity will be 128 (next power of two)
/// assert_eq!(tx.capacity(), 128);
/// ```
pub fn queue<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let inner = RingBuffer::<T>::allocate(capacity);

    (
        Producer { inner },
        Consumer {
            inner,
            local_head: 0,
        },
    )
}

/// The producing half of an MPSC queue.
///
/// Clone it to add producers; all clones share the same queue.
pub struct Producer<T> {
    inner: NonNull<RingBuffer<T>>,
}

// Safety: producers hand values over through the sequenced-slot protocol,
// which synchronizes every access; sharing across threads is the point.
unsafe impl<T: Send> Send for Producer<T> {}
unsafe impl<T: Send> Sync for Producer<T> {}

impl<T> Producer<T> {
    /// Attempts to push a value into the queue.
    ///
    /// # Errors
    ///
    /// Returns `Err(TryPushError::Full(value))` if the queue is full, with
    /// no state changed. Returns `Err(TryPushError::Disconnected(value))`
    /// if the consumer has been dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_queue::mpsc::{self, TryPushError};
    ///
    /// let (tx, rx) = mpsc::queue::<u32>(2);
    ///
    /// assert!(tx.try_push(1).is_ok());
    /// assert!(tx.try_push(2).is_ok());
    ///
    /// // Queue is now full
    /// assert!(matches!(tx.try_push(3), Err(TryPushError::Full(3))));
    /// ```
    #[inline]
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        let inner = unsafe { self.inner.as_ref() };

        if inner.is_consumer_disconnected() {
            return Err(TryPushError::Disconnected(value));
        }

        match inner.try_claim() {
            Some(index) => {
                // Safety: the claim made this slot ours, exactly once.
                unsafe {
                    inner.write_slot(index, value);
                    inner.publish(index);
                }
                Ok(())
            }
            None => {
                // Full. Recheck disconnect so a waiting caller can stop.
                if inner.is_consumer_disconnected() {
                    Err(TryPushError::Disconnected(value))
                } else {
                    Err(TryPushError::Full(value))
                }
            }
        }
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { self.inner.as_ref().capacity() }
    }

    /// Returns `true` if the consumer has been dropped.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        unsafe { self.inner.as_ref().is_consumer_disconnected() }
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        let inner = unsafe { self.inner.as_ref() };
        inner.add_producer();
        RingBuffer::acquire(self.inner);

        Self { inner: self.inner }
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        unsafe {
            self.inner.as_ref().remove_producer();
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

/// The consuming half of an MPSC queue.
///
/// Cannot be cloned; there is exactly one consumer.
pub struct Consumer<T> {
    inner: NonNull<RingBuffer<T>>,

    /// Our read position. We are the only reader, so no atomic needed;
    /// the shared copy is synced only when the consumer drops.
    local_head: usize,
}

// Safety: the consumer can move to another thread but never be shared.
unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Attempts to pop the front value from the queue.
    ///
    /// # Errors
    ///
    /// Returns `Err(TryPopError::Empty)` if no value is ready. That covers
    /// both a truly empty queue and a slot a producer has claimed but not
    /// yet published.
    ///
    /// Returns `Err(TryPopError::Disconnected)` if every producer has been
    /// dropped AND nothing is left in flight.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_queue::mpsc::{self, TryPopError};
    ///
    /// let (tx, mut rx) = mpsc::queue::<u32>(8);
    ///
    /// // Queue is empty
    /// assert!(matches!(rx.try_pop(), Err(TryPopError::Empty)));
    ///
    /// tx.try_push(42).unwrap();
    /// assert_eq!(rx.try_pop().unwrap(), 42);
    /// ```
    #[inline]
    pub fn try_pop(&mut self) -> Result<T, TryPopError> {
        let inner = unsafe { self.inner.as_ref() };

        // Safety: we are the only consumer.
        match unsafe { inner.try_read(self.local_head) } {
            Some(value) => {
                // The shared head is synced only at drop; producers watch
                // slot sequences, not the head counter.
                self.local_head = self.local_head.wrapping_add(1);
                Ok(value)
            }
            None => Err(self.pop_failure()),
        }
    }

    fn pop_failure(&self) -> TryPopError {
        let inner = unsafe { self.inner.as_ref() };

        if inner.producer_count() == 0 {
            // All producers gone. A claimed slot we have not seen the
            // publish for yet still counts as in flight.
            if self.local_head == inner.load_tail() {
                TryPopError::Disconnected
            } else {
                TryPopError::Empty
            }
        } else {
            TryPopError::Empty
        }
    }

    /// Pops a value, spinning until one appears.
    ///
    /// Backs off with a spin-then-yield loop; the thread is never parked.
    ///
    /// # Errors
    ///
    /// Returns `Err(PopError)` once every producer has disconnected and
    /// the queue is drained.
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

        // Safety: we are the only consumer, and the returned borrow ties
        // the slot to `self`.
        match unsafe { inner.peek_slot(self.local_head) } {
            Some(value) => Ok(value),
            None => Err(self.pop_failure()),
        }
    }

    /// Pops and drops every published element.
    ///
    /// Elements a producer is still writing are left for the next call.
    /// Calling `clear` on an empty queue is a no-op.
    pub fn clear(&mut self) {
        while let Ok(value) = self.try_pop() {
            drop(value);
        }
    }

    /// Returns the number of claimed slots ahead of the read position.
    ///
    /// This counts slots producers have claimed but not necessarily
    /// published yet, and is stale the instant it is read.
    #[inline]
    pub fn len(&self) -> usize {
        let inner = unsafe { self.inner.as_ref() };
        inner.load_tail().wrapping_sub(self.local_head)
    }

    /// Returns `true` if no slot is claimed ahead of the read position.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { self.inner.as_ref().capacity() }
    }

    /// Returns `true` if every producer has been dropped.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        unsafe { self.inner.as_ref().producer_count() == 0 }
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        unsafe {
            let inner = self.inner.as_ref();
            // Sync the read position so release can drop what remains.
            inner.store_head(self.local_head);
            inner.set_consumer_disconnected();
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
    /// No value is ready at the read position.
    Empty,
    /// Every producer has been dropped and the queue is drained.
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
            Self::Disconnected => write!(f, "all producers disconnected"),
        }
    }
}

impl std::error::Error for TryPopError {}

/// Error returned by [`Consumer::pop`] when every producer disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopError;

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all producers disconnected")
    }
}

impl std::error::Error for PopError {}
