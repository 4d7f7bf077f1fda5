// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core layout implementation: slot arena, pre-order links, lookups.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::LayoutError;
use crate::types::{Identity, ObjectId};

/// Index of a node in the slot arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Slot(u32);

impl Slot {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Slots use 32-bit indices by design."
    )]
    const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Node<K, T> {
    key: K,
    object: T,
    /// Depth in the tree; the root is at level 1.
    level: u32,
    parent: Option<Slot>,
    previous: Option<Slot>,
    next: Option<Slot>,
}

/// Tree registry storing one optional root and its descendants in a flat
/// pre-order list.
///
/// ## Usage
///
/// - Register the root with [`TreeLayout::save_root`].
/// - Register children with [`TreeLayout::save`], naming the parent object.
/// - Query with [`TreeLayout::parent_of`], [`TreeLayout::key_of`],
///   [`TreeLayout::object_of`] and [`TreeLayout::contains_object`].
/// - Remove a node and its subtree with [`TreeLayout::remove_by_key`].
///
/// `K` is the key type; `T` is the stored object, looked up by
/// [`Identity`]. Objects are handed back to the caller by value on removal.
pub struct TreeLayout<K, T> {
    nodes: Vec<Option<Node<K, T>>>, // slots
    free_list: Vec<usize>,
    root: Option<Slot>,
    keys: BTreeMap<K, Slot>,
    objects: BTreeMap<ObjectId, Slot>,
}

impl<K, T> Default for TreeLayout<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, T> Debug for TreeLayout<K, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.keys.len();
        let free = self.free_list.len();
        f.debug_struct("TreeLayout")
            .field("root", &self.root.map(|r| &self.node(r).key))
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

impl<K, T> TreeLayout<K, T> {
    /// Create an empty layout.
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: None,
            keys: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no node is registered.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The root object, if one is registered.
    pub fn root(&self) -> Option<&T> {
        self.root.map(|r| &self.node(r).object)
    }

    /// The root key, if a root is registered.
    pub fn root_key(&self) -> Option<&K> {
        self.root.map(|r| &self.node(r).key)
    }

    /// Iterate every node in pre-order, starting at the root.
    ///
    /// Siblings appear most recently inserted first.
    pub fn iter(&self) -> Walk<'_, K, T> {
        Walk {
            layout: self,
            next: self.root,
            floor: 0,
        }
    }

    /// Drop every node without reporting them.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = None;
        self.keys.clear();
        self.objects.clear();
    }

    // --- internals ---

    /// Access a live node; panics if `slot` was freed.
    fn node(&self, slot: Slot) -> &Node<K, T> {
        self.nodes[slot.idx()]
            .as_ref()
            .expect("dangling layout slot")
    }

    /// Access a live node mutably; panics if `slot` was freed.
    fn node_mut(&mut self, slot: Slot) -> &mut Node<K, T> {
        self.nodes[slot.idx()]
            .as_mut()
            .expect("dangling layout slot")
    }

    fn alloc(&mut self, node: Node<K, T>) -> Slot {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            Slot::new(idx)
        } else {
            self.nodes.push(Some(node));
            Slot::new(self.nodes.len() - 1)
        }
    }
}

impl<K, T> TreeLayout<K, T>
where
    K: Ord + Clone + Debug,
    T: Identity,
{
    /// Register the first and only root.
    ///
    /// Fails with [`LayoutError::DuplicateRoot`] if a root is present,
    /// [`LayoutError::DuplicateKey`] if `key` is registered, and
    /// [`LayoutError::DuplicateObject`] if `object` is registered.
    pub fn save_root(&mut self, key: K, object: T) -> Result<(), LayoutError> {
        const OP: &str = "save_root";
        if self.root.is_some() {
            return Err(LayoutError::DuplicateRoot { op: OP });
        }
        self.check_vacant(OP, &key, &object)?;
        let id = object.identity();
        let slot = self.alloc(Node {
            key: key.clone(),
            object,
            level: 1,
            parent: None,
            previous: None,
            next: None,
        });
        tracing::trace!(key = ?key, "saved root");
        self.keys.insert(key, slot);
        self.objects.insert(id, slot);
        self.root = Some(slot);
        Ok(())
    }

    /// Register `object` under `key` as the newest child of `under`.
    ///
    /// The new node is spliced directly after its parent, ahead of the parent's
    /// existing children, so both subtrees stay contiguous.
    ///
    /// Fails with [`LayoutError::UnregisteredParent`] if `under` is not
    /// registered, [`LayoutError::DuplicateKey`] if `key` is registered, and
    /// [`LayoutError::DuplicateObject`] if `object` is registered.
    pub fn save(&mut self, key: K, object: T, under: &T) -> Result<(), LayoutError> {
        const OP: &str = "save";
        let Some(&parent) = self.objects.get(&under.identity()) else {
            return Err(LayoutError::UnregisteredParent { op: OP });
        };
        self.check_vacant(OP, &key, &object)?;
        let id = object.identity();
        let (level, after) = {
            let p = self.node(parent);
            (p.level + 1, p.next)
        };
        let slot = self.alloc(Node {
            key: key.clone(),
            object,
            level,
            parent: Some(parent),
            previous: Some(parent),
            next: after,
        });
        if let Some(a) = after {
            self.node_mut(a).previous = Some(slot);
        }
        self.node_mut(parent).next = Some(slot);
        tracing::trace!(key = ?key, level, "saved node");
        self.keys.insert(key, slot);
        self.objects.insert(id, slot);
        Ok(())
    }

    /// Remove the node registered under `key` together with its subtree.
    ///
    /// Each removed object is passed to `on_removed` exactly once, in list
    /// order: the node itself first, then its descendants in pre-order.
    /// Returns the number of removed nodes; an absent key removes nothing.
    pub fn remove_by_key(&mut self, key: &K, mut on_removed: impl FnMut(T)) -> usize {
        let Some(&start) = self.keys.get(key) else {
            return 0;
        };
        let (floor, before) = {
            let n = self.node(start);
            (n.level, n.previous)
        };

        // Walk the contiguous run: `start`, then every following node deeper than it.
        let mut count = 0;
        let mut cursor = Some(start);
        while let Some(slot) = cursor {
            let node = self.nodes[slot.idx()]
                .take()
                .expect("dangling layout slot");
            self.free_list.push(slot.idx());
            self.keys.remove(&node.key);
            self.objects.remove(&node.object.identity());
            count += 1;
            cursor = node.next.filter(|&n| self.node(n).level > floor);
            if cursor.is_none() {
                // First node after the run, if any.
                let after = node.next;
                on_removed(node.object);
                self.splice(before, after);
                break;
            }
            on_removed(node.object);
        }

        if self.root == Some(start) {
            self.root = None;
        }
        tracing::debug!(key = ?key, removed = count, "removed subtree");
        count
    }

    /// Parent of `object`, or `None` if `object` is the root.
    ///
    /// Fails with [`LayoutError::UnregisteredObject`] if `object` is not
    /// registered.
    pub fn parent_of(&self, object: &T) -> Result<Option<&T>, LayoutError> {
        let slot = self.slot_of("parent_of", object)?;
        Ok(self.node(slot).parent.map(|p| &self.node(p).object))
    }

    /// Key `object` is registered under.
    pub fn key_of(&self, object: &T) -> Option<&K> {
        self.find_by_identity(object.identity())
            .map(|slot| &self.node(slot).key)
    }

    /// Object registered under `key`.
    pub fn object_of(&self, key: &K) -> Option<&T> {
        self.keys.get(key).map(|&slot| &self.node(slot).object)
    }

    /// Object with the given identity.
    ///
    /// Useful when the caller only holds a borrow of the pointee; see
    /// [`ObjectId::of_ref`].
    pub fn object_by_identity(&self, id: ObjectId) -> Option<&T> {
        self.find_by_identity(id).map(|slot| &self.node(slot).object)
    }

    /// True if `object` is registered (by identity).
    pub fn contains_object(&self, object: &T) -> bool {
        self.objects.contains_key(&object.identity())
    }

    /// True if `key` is registered.
    pub fn contains_key(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    /// Parent key of the node registered under `key`.
    ///
    /// Returns `None` if `key` is absent or names the root.
    pub fn parent_key_of(&self, key: &K) -> Option<&K> {
        let &slot = self.keys.get(key)?;
        self.node(slot).parent.map(|p| &self.node(p).key)
    }

    /// Depth of `object` (root = 1), or `None` if it is not registered.
    pub fn level_of(&self, object: &T) -> Option<u32> {
        self.find_by_identity(object.identity())
            .map(|slot| self.node(slot).level)
    }

    /// Iterate the subtree run of `key`: the node itself, then its descendants
    /// in pre-order. Empty if `key` is absent.
    pub fn subtree(&self, key: &K) -> Walk<'_, K, T> {
        match self.keys.get(key) {
            Some(&slot) => Walk {
                layout: self,
                next: Some(slot),
                floor: self.node(slot).level,
            },
            None => Walk {
                layout: self,
                next: None,
                floor: 0,
            },
        }
    }

    /// Direct children of `object`, most recently inserted first.
    ///
    /// Fails with [`LayoutError::UnregisteredObject`] if `object` is not
    /// registered.
    pub fn children_of(&self, object: &T) -> Result<Vec<&T>, LayoutError> {
        let slot = self.slot_of("children_of", object)?;
        let level = self.node(slot).level;
        let mut out = Vec::new();
        let mut cursor = self.node(slot).next;
        while let Some(s) = cursor {
            let node = self.node(s);
            if node.level <= level {
                break;
            }
            if node.level == level + 1 {
                out.push(&node.object);
            }
            cursor = node.next;
        }
        Ok(out)
    }

    /// Path from the root to `object` (inclusive).
    ///
    /// Fails with [`LayoutError::UnregisteredObject`] if `object` is not
    /// registered.
    pub fn path_to_root(&self, object: &T) -> Result<Vec<&T>, LayoutError> {
        let mut cur = self.slot_of("path_to_root", object)?;
        let mut out = Vec::new();
        loop {
            let node = self.node(cur);
            out.push(&node.object);
            match node.parent {
                Some(p) => cur = p,
                None => break,
            }
        }
        out.reverse();
        Ok(out)
    }

    fn find_by_identity(&self, id: ObjectId) -> Option<Slot> {
        self.objects.get(&id).copied()
    }

    fn slot_of(&self, op: &'static str, object: &T) -> Result<Slot, LayoutError> {
        self.find_by_identity(object.identity())
            .ok_or(LayoutError::UnregisteredObject { op })
    }

    fn check_vacant(&self, op: &'static str, key: &K, object: &T) -> Result<(), LayoutError> {
        if self.keys.contains_key(key) {
            return Err(LayoutError::DuplicateKey {
                op,
                key: format!("{key:?}"),
            });
        }
        if let Some(slot) = self.find_by_identity(object.identity()) {
            return Err(LayoutError::DuplicateObject {
                op,
                key: format!("{:?}", self.node(slot).key),
            });
        }
        Ok(())
    }

    /// Link `before` directly to `after`, closing the gap left by a removed run.
    fn splice(&mut self, before: Option<Slot>, after: Option<Slot>) {
        if let Some(b) = before {
            self.node_mut(b).next = after;
        }
        if let Some(a) = after {
            self.node_mut(a).previous = before;
        }
    }
}

/// Pre-order iterator over `(key, object)` pairs of a [`TreeLayout`].
///
/// Returned by [`TreeLayout::iter`] and [`TreeLayout::subtree`].
pub struct Walk<'a, K, T> {
    layout: &'a TreeLayout<K, T>,
    next: Option<Slot>,
    /// Nodes at or above this level end the walk (after the first).
    floor: u32,
}

impl<K, T> Debug for Walk<'_, K, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Walk")
            .field("next", &self.next)
            .field("floor", &self.floor)
            .finish_non_exhaustive()
    }
}

impl<'a, K, T> Iterator for Walk<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let layout = self.layout;
        let node = layout.node(self.next?);
        let floor = self.floor;
        self.next = node.next.filter(|&n| layout.node(n).level > floor);
        Some((&node.key, &node.object))
    }
}
