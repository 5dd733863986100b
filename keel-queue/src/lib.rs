//! # keel-queue
//!
//! Lock-free bounded queues for handing values between threads without
//! locks, syscalls, or allocation after construction.
//!
//! ## Queues
//!
//! - **SPSC**: single-producer single-consumer queue with no atomic
//!   read-modify-write operations on the hot path
//! - **MPSC**: multi-producer single-consumer queue coordinated by
//!   per-slot sequence numbers
//!
//! ## Design Goals
//!
//! - Predictable latency (no jitter from locks or parking)
//! - No allocations after construction
//! - Cache-line isolation to prevent false sharing
//! - Single contiguous allocation per queue (no pointer chasing)
//! - Blocking variants spin and yield; they never touch the kernel
//!
//! ## Example
//!
//! ```
//! use keel_queue::spsc;
//!
//! // Create a queue with capacity for 1024 elements
//! // (will be rounded up to next power of two)
//! let (mut tx, mut rx) = spsc::queue::<u64>(1024);
//!
//! // Push a value
//! tx.try_push(42).unwrap();
//!
//! // Pop the value
//! assert_eq!(rx.try_pop().unwrap(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod mpsc;
pub mod spsc;
