// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Tree Layout: a flat, pre-order tree registry.
//!
//! ## Overview
//!
//! [`TreeLayout`] stores the shape of a tree of objects, each registered under a
//! stable key. It answers parent, key, and object lookups and supports inserting
//! a node under a parent and removing a node together with its whole subtree.
//!
//! It does not own any behavior of the objects it stores. Higher layers (for
//! example a member network) drive lifecycles and events and use this crate only
//! for structure.
//!
//! ## Layout
//!
//! Every node is threaded into one doubly linked list ordered by a pre-order
//! walk, and carries its depth (`level`, root = 1). A new node is spliced
//! immediately after its parent, so:
//!
//! - a node's subtree is the contiguous run of nodes after it whose level is
//!   strictly greater than its own;
//! - the most recently inserted child comes first among its siblings;
//! - removing a subtree is one forward scan bounded by the subtree size, and
//!   inserting is O(1) plus the map updates.
//!
//! Nodes live in a slot arena indexed by integers. Links are slot indices,
//! never pointers, and freed slots are reused.
//!
//! ## Identity
//!
//! Objects are looked up by identity, not by value. The object type implements
//! [`Identity`]; `Rc<T>` and `Arc<T>` do so through their allocation address.
//! Two objects that compare equal by value are still distinct entries.
//!
//! ## Errors
//!
//! Misuse of the API (a second root, a duplicate key or object, an unregistered
//! parent or object) is reported as a distinct [`LayoutError`] variant naming
//! the offending operation.
//!
//! ## Minimal example
//!
//! ```
//! use std::rc::Rc;
//! use understory_tree_layout::{LayoutError, TreeLayout};
//!
//! let root = Rc::new("root");
//! let a = Rc::new("a");
//! let b = Rc::new("b");
//!
//! let mut layout: TreeLayout<u32, Rc<&str>> = TreeLayout::new();
//! layout.save_root(0, root.clone()).unwrap();
//! layout.save(1, a.clone(), &root).unwrap();
//! layout.save(2, b.clone(), &a).unwrap();
//!
//! assert_eq!(layout.parent_of(&b).unwrap(), Some(&a));
//!
//! let mut removed = Vec::new();
//! let count = layout.remove_by_key(&1, |obj| removed.push(obj));
//! assert_eq!(count, 2);
//! assert_eq!(removed, vec![a, b.clone()]);
//! assert!(matches!(
//!     layout.parent_of(&b),
//!     Err(LayoutError::UnregisteredObject { .. })
//! ));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod layout;
mod types;

pub use error::LayoutError;
pub use layout::{TreeLayout, Walk};
pub use types::{Identity, ObjectId};
