//! Manually allocated buffers and the sequential containers built on them.
//!
//! This crate is the foundation of the `keel` workspace: containers for
//! hosts (game loops, real-time simulation) where allocation timing must
//! be controlled by the caller, not the collection.
//!
//! # Design Philosophy
//!
//! Every structure here owns one contiguous region it allocated itself and
//! addresses elements by slot index:
//!
//! ```text
//! RawBuffer<T>   - pointer + slot count + ownership flag, no liveness
//! Array/List/... - liveness bookkeeping layered on top, bounds checked
//! ```
//!
//! Element liveness is the container's knowledge, never the buffer's. The
//! buffer moves bytes; the container decides which slots are live and
//! drops exactly those. This split keeps the unsafe surface in one small
//! file and lets every container share the same allocation, copy, and
//! scan primitives.
//!
//! # Fixed and dynamic modes
//!
//! Growable containers take a `const MODE: bool` parameter:
//!
//! - [`FIXED`]: capacity is set at construction and never changes.
//!   Mutating calls that need a new slot return [`Full`] with the value
//!   handed back.
//! - [`DYNAMIC`]: the backing buffer doubles when exhausted. Growth is a
//!   raw relocation; elements are never dropped or re-created by it.
//!
//! `Fixed*`/`Dynamic*` aliases are provided for both spellings of every
//! container.
//!
//! # Quick Start
//!
//! ```
//! use keel_buffer::{DynamicList, FixedList};
//!
//! // Fixed: full is an error carrying the rejected value.
//! let mut fixed: FixedList<u64> = FixedList::with_capacity(2);
//! fixed.push(1).unwrap();
//! fixed.push(2).unwrap();
//! assert_eq!(fixed.push(3).unwrap_err().into_inner(), 3);
//!
//! // Dynamic: same API, grows instead.
//! let mut dynamic: DynamicList<u64> = DynamicList::with_capacity(2);
//! for v in 0..100 {
//!     dynamic.push(v).unwrap();
//! }
//! assert_eq!(dynamic.len(), 100);
//! ```

#![warn(missing_docs)]

pub mod array;
pub mod list;
pub mod pod;
pub mod queue;
pub mod raw;
pub mod ring;
pub mod stack;

pub use array::Array;
pub use list::{DynamicList, FixedList, List};
pub use pod::Pod;
pub use queue::{DynamicQueue, FixedQueue, Queue};
pub use raw::RawBuffer;
pub use ring::Ring;
pub use stack::{DynamicStack, FixedStack, Stack};

// =============================================================================
// Mode Constants
// =============================================================================

/// Fixed-capacity mode - pre-allocated, no growth.
pub const FIXED: bool = true;

/// Dynamic mode - grows on demand.
pub const DYNAMIC: bool = false;

// =============================================================================
// Errors
// =============================================================================

/// Error returned when a fixed-capacity container is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the value that could not be inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> core::fmt::Display for Full<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "container is full")
    }
}

impl<T: core::fmt::Debug> std::error::Error for Full<T> {}
