//! Keyed collections over manually allocated storage.
//!
//! Two engines, four façades. The open-hashing engine
//! ([`table::RawTable`]) backs [`HashMap`] and [`HashSet`]; the AVL
//! engine ([`tree::AvlTree`]) backs [`OrderedMap`] and [`OrderedSet`].
//! Both store keys and values inline in index-addressed slot arrays
//! from `keel_buffer`, reuse freed slots through intrusive free lists,
//! and never hand out interior pointers that could dangle across
//! growth.
//!
//! # Capacity modes
//!
//! Every collection takes the workspace's `const MODE: bool` parameter:
//! [`FIXED`] rejects inserts that need a new slot with [`Full`]
//! (carrying the value back), [`DYNAMIC`] grows. Hash capacities come
//! from a fixed prime table; tree capacities double.
//!
//! # Quick Start
//!
//! ```
//! use keel_collections::{DynamicHashMap, DynamicOrderedSet};
//!
//! let mut scores: DynamicHashMap<String, u32> = DynamicHashMap::with_capacity(8);
//! scores.insert("alice".to_string(), 10).unwrap();
//! scores.insert("bob".to_string(), 20).unwrap();
//! assert_eq!(scores.get("bob"), Some(&20));
//!
//! let mut ranks: DynamicOrderedSet<u32> = DynamicOrderedSet::with_capacity(8);
//! for rank in [30, 10, 20] {
//!     ranks.insert(rank).unwrap();
//! }
//! let sorted: Vec<u32> = ranks.iter().copied().collect();
//! assert_eq!(sorted, [10, 20, 30]);
//! ```

#![warn(missing_docs)]

pub mod map;
pub mod ordered_map;
pub mod ordered_set;
pub mod set;
pub mod table;
pub mod tree;

pub use map::{DynamicHashMap, FixedHashMap, HashMap};
pub use ordered_map::{DynamicOrderedMap, FixedOrderedMap, OrderedMap};
pub use ordered_set::{DynamicOrderedSet, FixedOrderedSet, OrderedSet};
pub use set::{DynamicHashSet, FixedHashSet, HashSet};
pub use table::RawTable;
pub use tree::AvlTree;

pub use keel_buffer::{Full, DYNAMIC, FIXED};
