//! AVL ordered-collection engine.
//!
//! [`AvlTree`] keeps keys in a balanced binary search tree whose nodes
//! live in an index-addressed pool. It backs
//! [`OrderedMap`](crate::OrderedMap) and
//! [`OrderedSet`](crate::OrderedSet).
//!
//! # Memory Layout
//!
//! ```text
//! nodes: [Node<K, V>; capacity]   left/right/balance + inline key/value
//! ```
//!
//! Links are 1-based slot indices (0 is null). Rotations rewrite a
//! handful of integers, the structure cannot form pointer cycles, and
//! every link stays valid when a dynamic pool relocates on growth.
//! Freed slots form a free list threaded through `left`.
//!
//! Rebalancing is iterative: mutating operations record their descent
//! path (at most [`MAX_DEPTH`] levels) and walk it backwards adjusting
//! balance factors, rotating wherever a subtree tips to ±2.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use keel_buffer::{Full, RawBuffer, FIXED};

/// Deepest descent path a mutating operation will record.
///
/// An AVL tree holding `u32::MAX` nodes stays under 47 levels, so the
/// limit is unreachable through the public API; hitting it panics
/// rather than walking past the recorded path.
pub const MAX_DEPTH: usize = 64;

struct Node<K, V> {
    /// 1-based link to the left child, or the next free slot when this
    /// slot is on the free list. 0 terminates both.
    left: u32,
    /// 1-based link to the right child.
    right: u32,
    /// Height difference `right - left`, in `{-1, 0, 1}` outside a
    /// rotation.
    balance: i8,
    key: MaybeUninit<K>,
    value: MaybeUninit<V>,
}

/// AVL tree with inline keys and values in an index-addressed pool.
///
/// Lookup, insertion, and removal are O(log n) with iterative
/// rebalancing; iteration is in-order through an explicit stack, so
/// nodes carry no parent links and nothing recurses.
pub struct AvlTree<K, V, const MODE: bool> {
    nodes: RawBuffer<Node<K, V>>,
    root: u32,
    /// Bump high-water mark: slots `1..=count` have been used at least
    /// once.
    count: u32,
    free_head: u32,
    free_count: u32,
}

impl<K, V, const MODE: bool> AvlTree<K, V, MODE> {
    /// Creates a tree with room for `capacity` nodes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or does not fit the `u32` index range.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        assert!(
            capacity <= u32::MAX as usize,
            "capacity exceeds the index range"
        );
        Self {
            nodes: RawBuffer::alloc_zeroed(capacity),
            root: 0,
            count: 0,
            free_head: 0,
            free_count: 0,
        }
    }

    /// Returns the number of live nodes.
    #[inline]
    pub const fn len(&self) -> usize {
        (self.count - self.free_count) as usize
    }

    /// Returns `true` if the tree holds no nodes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == self.free_count
    }

    /// Returns the pool capacity in nodes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn node(&self, index: u32) -> &Node<K, V> {
        debug_assert!(index != 0 && index <= self.count);
        // Safety: node slots are valid `Node` values from the zeroed
        // allocation onward; key/value liveness is tracked by reach.
        unsafe { self.nodes.get_unchecked(index as usize - 1) }
    }

    #[inline]
    fn node_mut(&mut self, index: u32) -> &mut Node<K, V> {
        debug_assert!(index != 0 && index <= self.count);
        // Safety: as in `node`.
        unsafe { self.nodes.get_unchecked_mut(index as usize - 1) }
    }

    /// Walks from the root, returning the slot index of `key` or 0.
    fn find_index<Q>(&self, key: &Q) -> u32
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut index = self.root;
        while index != 0 {
            let node = self.node(index);
            // Safety: live nodes hold initialized keys.
            let stored = unsafe { node.key.assume_init_ref() };
            index = match key.cmp(stored.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return index,
            };
        }
        0
    }

    /// Returns the key and value stored for `key`, if present.
    pub fn get<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find_index(key);
        if index == 0 {
            return None;
        }
        let node = self.node(index);
        // Safety: live nodes hold initialized pairs.
        Some(unsafe { (node.key.assume_init_ref(), node.value.assume_init_ref()) })
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find_index(key);
        if index == 0 {
            return None;
        }
        // Safety: live nodes hold initialized values.
        Some(unsafe { self.node_mut(index).value.assume_init_mut() })
    }

    /// Returns `true` if `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_index(key) != 0
    }

    /// Returns the smallest key and its value.
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut index = self.root;
        if index == 0 {
            return None;
        }
        loop {
            let left = self.node(index).left;
            if left == 0 {
                break;
            }
            index = left;
        }
        let node = self.node(index);
        // Safety: live nodes hold initialized pairs.
        Some(unsafe { (node.key.assume_init_ref(), node.value.assume_init_ref()) })
    }

    /// Returns the largest key and its value.
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut index = self.root;
        if index == 0 {
            return None;
        }
        loop {
            let right = self.node(index).right;
            if right == 0 {
                break;
            }
            index = right;
        }
        let node = self.node(index);
        // Safety: live nodes hold initialized pairs.
        Some(unsafe { (node.key.assume_init_ref(), node.value.assume_init_ref()) })
    }

    /// Returns `true` if a new slot can be taken without growing.
    #[inline]
    fn has_slot(&self) -> bool {
        self.free_head != 0 || (self.count as usize) < self.capacity()
    }

    /// Takes a slot index off the free list, or bumps the high-water
    /// mark. Must only be called when `has_slot()`.
    fn acquire_slot(&mut self) -> u32 {
        if self.free_head != 0 {
            let index = self.free_head;
            self.free_head = self.node(index).left;
            self.free_count -= 1;
            return index;
        }
        debug_assert!((self.count as usize) < self.capacity());
        self.count += 1;
        self.count
    }

    /// Doubles the pool of a dynamic tree. Slot indices survive the
    /// relocation.
    fn expand(&mut self) {
        debug_assert!(MODE != FIXED);
        let new_capacity = self.capacity() * 2;
        assert!(
            new_capacity <= u32::MAX as usize,
            "capacity exceeds the index range"
        );
        self.nodes.grow(new_capacity);
    }

    /// Writes `child` into the link that led to `path[level]`; level 0
    /// rewrites the root.
    fn attach(&mut self, path: &[(u32, i8); MAX_DEPTH], level: usize, child: u32) {
        if level == 0 {
            self.root = child;
        } else {
            let (parent, dir) = path[level - 1];
            if dir < 0 {
                self.node_mut(parent).left = child;
            } else {
                self.node_mut(parent).right = child;
            }
        }
    }

    /// Inserts `key`/`value`.
    ///
    /// An existing key has its value replaced (the old value is
    /// returned) with no structural change. A fixed tree that is out
    /// of slots returns the pair in `Err(Full)`; a dynamic tree
    /// doubles its pool.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Full<(K, V)>>
    where
        K: Ord,
    {
        let mut path = [(0u32, 0i8); MAX_DEPTH];
        let mut depth = 0usize;

        let mut index = self.root;
        while index != 0 {
            let node = self.node(index);
            let (left, right) = (node.left, node.right);
            // Safety: live nodes hold initialized keys.
            let ordering = key.cmp(unsafe { node.key.assume_init_ref() });
            match ordering {
                Ordering::Equal => {
                    // Safety: live nodes hold initialized values.
                    let old = unsafe { self.node_mut(index).value.assume_init_mut() };
                    return Ok(Some(mem::replace(old, value)));
                }
                Ordering::Less => {
                    assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
                    path[depth] = (index, -1);
                    depth += 1;
                    index = left;
                }
                Ordering::Greater => {
                    assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
                    path[depth] = (index, 1);
                    depth += 1;
                    index = right;
                }
            }
        }

        if !self.has_slot() {
            if MODE == FIXED {
                return Err(Full((key, value)));
            }
            self.expand();
        }
        let new_index = self.acquire_slot();
        let node = self.node_mut(new_index);
        node.left = 0;
        node.right = 0;
        node.balance = 0;
        node.key = MaybeUninit::new(key);
        node.value = MaybeUninit::new(value);

        if depth == 0 {
            self.root = new_index;
            return Ok(None);
        }
        self.attach(&path, depth, new_index);

        // Retrace: the new leaf grew the recorded side of each
        // ancestor. A balance that settles at zero means the subtree
        // height did not change; a rotation restores the old height.
        // Either ends the walk.
        let mut level = depth;
        while level > 0 {
            level -= 1;
            let (node_index, dir) = path[level];
            let balance = {
                let node = self.node_mut(node_index);
                node.balance += dir;
                node.balance
            };
            match balance {
                0 => break,
                -1 | 1 => {}
                _ => {
                    let subtree = self.rebalance(node_index);
                    self.attach(&path, level, subtree);
                    break;
                }
            }
        }
        Ok(None)
    }

    /// Removes the node for `key`, returning its pair.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut path = [(0u32, 0i8); MAX_DEPTH];
        let mut depth = 0usize;

        let mut index = self.root;
        while index != 0 {
            let node = self.node(index);
            let (left, right) = (node.left, node.right);
            // Safety: live nodes hold initialized keys.
            let ordering = key.cmp(unsafe { node.key.assume_init_ref() }.borrow());
            match ordering {
                Ordering::Equal => {
                    return Some(self.remove_at(index, left, right, &mut path, depth));
                }
                Ordering::Less => {
                    assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
                    path[depth] = (index, -1);
                    depth += 1;
                    index = left;
                }
                Ordering::Greater => {
                    assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
                    path[depth] = (index, 1);
                    depth += 1;
                    index = right;
                }
            }
        }
        None
    }

    /// Detaches the located node, hands back its pair, and rebalances
    /// along the recorded path.
    fn remove_at(
        &mut self,
        index: u32,
        left: u32,
        right: u32,
        path: &mut [(u32, i8); MAX_DEPTH],
        mut depth: usize,
    ) -> (K, V) {
        let (freed, replacement, pair) = if left != 0 && right != 0 {
            // Two children: the in-order successor surrenders its pair
            // to this node and its own right subtree takes its slot.
            // The descent extends the recorded path so the retrace
            // covers the successor's former ancestors.
            assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
            path[depth] = (index, 1);
            depth += 1;

            let mut successor = right;
            loop {
                let next_left = self.node(successor).left;
                if next_left == 0 {
                    break;
                }
                assert!(depth < MAX_DEPTH, "tree exceeds the maximum depth");
                path[depth] = (successor, -1);
                depth += 1;
                successor = next_left;
            }
            let successor_right = self.node(successor).right;

            // Safety: both nodes are live; the successor slot is
            // retired below, so its pair is moved, never duplicated.
            let pair = unsafe {
                let moved = {
                    let node = self.node_mut(successor);
                    (node.key.assume_init_read(), node.value.assume_init_read())
                };
                let node = self.node_mut(index);
                let pair = (node.key.assume_init_read(), node.value.assume_init_read());
                node.key = MaybeUninit::new(moved.0);
                node.value = MaybeUninit::new(moved.1);
                pair
            };
            (successor, successor_right, pair)
        } else {
            // Safety: the node is live; its slot is retired below.
            let pair = unsafe {
                let node = self.node_mut(index);
                (node.key.assume_init_read(), node.value.assume_init_read())
            };
            // At most one child; splice it into the parent link.
            (index, left | right, pair)
        };

        self.attach(path, depth, replacement);

        // Retire the slot.
        let free_head = self.free_head;
        self.node_mut(freed).left = free_head;
        self.free_head = freed;
        self.free_count += 1;

        // Retrace: the freed side of each recorded node lost one
        // level. A balance that lands on ±1 means the subtree height
        // is unchanged, as does a rotation whose new root is not
        // balanced. Either ends the walk.
        let mut level = depth;
        while level > 0 {
            level -= 1;
            let (node_index, dir) = path[level];
            let balance = {
                let node = self.node_mut(node_index);
                node.balance -= dir;
                node.balance
            };
            match balance {
                -1 | 1 => break,
                0 => {}
                _ => {
                    let subtree = self.rebalance(node_index);
                    self.attach(path, level, subtree);
                    if self.node(subtree).balance != 0 {
                        break;
                    }
                }
            }
        }

        pair
    }

    /// Rotates the ±2 node at `index`; returns the new subtree root.
    ///
    /// Single or double rotation is chosen by the sign of the tall
    /// child's balance.
    fn rebalance(&mut self, index: u32) -> u32 {
        let balance = self.node(index).balance;
        debug_assert!(balance == -2 || balance == 2, "rotation on a balanced node");
        if balance > 0 {
            let right = self.node(index).right;
            if self.node(right).balance < 0 {
                self.rotate_right_left(index)
            } else {
                self.rotate_left(index)
            }
        } else {
            let left = self.node(index).left;
            if self.node(left).balance > 0 {
                self.rotate_left_right(index)
            } else {
                self.rotate_right(index)
            }
        }
    }

    /// Single left rotation.
    ///
    /// ```text
    ///   n                r
    ///  / \              / \
    /// A   r     =>     n   C
    ///    / \          / \
    ///   B   C        A   B
    /// ```
    fn rotate_left(&mut self, n: u32) -> u32 {
        let r = self.node(n).right;
        let b = self.node(r).left;
        self.node_mut(n).right = b;
        self.node_mut(r).left = n;

        if self.node(r).balance == 0 {
            // Reached only when a removal shortened `A`: the pair
            // keeps one extra level on the inside.
            self.node_mut(n).balance = 1;
            self.node_mut(r).balance = -1;
        } else {
            self.node_mut(n).balance = 0;
            self.node_mut(r).balance = 0;
        }
        r
    }

    /// Single right rotation, the mirror of `rotate_left`.
    fn rotate_right(&mut self, n: u32) -> u32 {
        let l = self.node(n).left;
        let b = self.node(l).right;
        self.node_mut(n).left = b;
        self.node_mut(l).right = n;

        if self.node(l).balance == 0 {
            self.node_mut(n).balance = -1;
            self.node_mut(l).balance = 1;
        } else {
            self.node_mut(n).balance = 0;
            self.node_mut(l).balance = 0;
        }
        l
    }

    /// Double rotation: right around `r`, then left around `n`.
    ///
    /// ```text
    ///   n                  m
    ///  / \               /   \
    /// A   r             n     r
    ///    / \    =>     / \   / \
    ///   m   D         A   B C   D
    ///  / \
    /// B   C
    /// ```
    fn rotate_right_left(&mut self, n: u32) -> u32 {
        let r = self.node(n).right;
        let m = self.node(r).left;
        let (b, c, mid_balance) = {
            let mid = self.node(m);
            (mid.left, mid.right, mid.balance)
        };

        self.node_mut(n).right = b;
        self.node_mut(r).left = c;
        self.node_mut(m).left = n;
        self.node_mut(m).right = r;

        self.node_mut(n).balance = if mid_balance > 0 { -1 } else { 0 };
        self.node_mut(r).balance = if mid_balance < 0 { 1 } else { 0 };
        self.node_mut(m).balance = 0;
        m
    }

    /// Double rotation: left around `l`, then right around `n`, the
    /// mirror of `rotate_right_left`.
    fn rotate_left_right(&mut self, n: u32) -> u32 {
        let l = self.node(n).left;
        let m = self.node(l).right;
        let (b, c, mid_balance) = {
            let mid = self.node(m);
            (mid.left, mid.right, mid.balance)
        };

        self.node_mut(l).right = b;
        self.node_mut(n).left = c;
        self.node_mut(m).left = l;
        self.node_mut(m).right = n;

        self.node_mut(l).balance = if mid_balance > 0 { -1 } else { 0 };
        self.node_mut(n).balance = if mid_balance < 0 { 1 } else { 0 };
        self.node_mut(m).balance = 0;
        m
    }

    /// Drops every live pair and resets the structure. Idempotent;
    /// capacity is kept.
    pub fn clear(&mut self) {
        let mut index = self.root;
        // Detach everything first so a panicking drop cannot double
        // free; pairs not yet visited leak in that case.
        self.root = 0;
        self.count = 0;
        self.free_head = 0;
        self.free_count = 0;

        let mut stack = [0u32; MAX_DEPTH];
        let mut top = 0usize;
        while index != 0 || top > 0 {
            while index != 0 {
                stack[top] = index;
                top += 1;
                // Safety: the detached structure is intact and every
                // link points at a live node.
                index = unsafe { self.nodes.get_unchecked(index as usize - 1) }.left;
            }
            top -= 1;
            let current = stack[top] as usize - 1;
            // Safety: each node is visited exactly once after detach.
            unsafe {
                let node = self.nodes.get_unchecked_mut(current);
                let right = node.right;
                node.key.assume_init_drop();
                node.value.assume_init_drop();
                index = right;
            }
        }
    }

    /// Returns an in-order iterator over the pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            nodes: node_base(&self.nodes),
            stack: [0; MAX_DEPTH],
            top: 0,
            remaining: self.len(),
            _marker: PhantomData,
        };
        push_left_spine(iter.nodes, &mut iter.stack, &mut iter.top, self.root);
        iter
    }

    /// Returns an in-order iterator with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let mut iter = IterMut {
            nodes: node_base(&self.nodes),
            stack: [0; MAX_DEPTH],
            top: 0,
            remaining: self.len(),
            _marker: PhantomData,
        };
        push_left_spine(iter.nodes, &mut iter.stack, &mut iter.top, self.root);
        iter
    }

    #[cfg(test)]
    fn check_invariants(&self)
    where
        K: Ord,
    {
        fn walk<K: Ord, V, const MODE: bool>(tree: &AvlTree<K, V, MODE>, index: u32) -> i32 {
            if index == 0 {
                return 0;
            }
            let node = tree.node(index);
            let left = walk(tree, node.left);
            let right = walk(tree, node.right);
            assert!((-1..=1).contains(&node.balance), "balance out of range");
            assert_eq!(i32::from(node.balance), right - left, "stale balance");
            1 + left.max(right)
        }
        walk(self, self.root);

        let mut previous: Option<&K> = None;
        let mut visited = 0;
        for (key, _) in self.iter() {
            if let Some(prev) = previous {
                assert!(prev < key, "keys out of order");
            }
            previous = Some(key);
            visited += 1;
        }
        assert_eq!(visited, self.len());
    }
}

#[inline]
fn node_base<K, V>(nodes: &RawBuffer<Node<K, V>>) -> NonNull<Node<K, V>> {
    // Safety: RawBuffer base pointers are never null.
    unsafe { NonNull::new_unchecked(nodes.as_ptr()) }
}

/// Pushes `index` and its chain of left children onto the stack.
fn push_left_spine<K, V>(
    nodes: NonNull<Node<K, V>>,
    stack: &mut [u32; MAX_DEPTH],
    top: &mut usize,
    mut index: u32,
) {
    while index != 0 {
        stack[*top] = index;
        *top += 1;
        // Safety: links reachable from a live root point at live nodes.
        index = unsafe { (*nodes.as_ptr().add(index as usize - 1)).left };
    }
}

impl<K, V, const MODE: bool> Drop for AvlTree<K, V, MODE> {
    fn drop(&mut self) {
        self.clear();
        // The buffer field releases the memory.
    }
}

impl<K, V, const MODE: bool> fmt::Debug for AvlTree<K, V, MODE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvlTree")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// In-order iterator over the pairs of an [`AvlTree`].
pub struct Iter<'a, K, V> {
    nodes: NonNull<Node<K, V>>,
    stack: [u32; MAX_DEPTH],
    top: usize,
    remaining: usize,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.top == 0 {
            return None;
        }
        self.top -= 1;
        let index = self.stack[self.top];
        // Safety: stack indices are live; the spine push only touches
        // descendants of the popped node.
        let node = unsafe { &*self.nodes.as_ptr().add(index as usize - 1) };
        push_left_spine(self.nodes, &mut self.stack, &mut self.top, node.right);
        self.remaining -= 1;
        // Safety: live nodes hold initialized pairs.
        Some(unsafe { (node.key.assume_init_ref(), node.value.assume_init_ref()) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// In-order iterator over the pairs of an [`AvlTree`] with mutable
/// values.
pub struct IterMut<'a, K, V> {
    nodes: NonNull<Node<K, V>>,
    stack: [u32; MAX_DEPTH],
    top: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut Node<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<(&'a K, &'a mut V)> {
        if self.top == 0 {
            return None;
        }
        self.top -= 1;
        let index = self.stack[self.top];
        let base = self.nodes.as_ptr();
        // Safety: stack indices are live and visited once; the spine
        // push only touches descendants of the popped node.
        let right = unsafe { (*base.add(index as usize - 1)).right };
        push_left_spine(self.nodes, &mut self.stack, &mut self.top, right);
        self.remaining -= 1;
        let node = unsafe { &mut *base.add(index as usize - 1) };
        // Safety: live nodes hold initialized pairs, and this iterator
        // holds the only live borrow of the tree.
        Some(unsafe { (node.key.assume_init_ref(), node.value.assume_init_mut()) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
