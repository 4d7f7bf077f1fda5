// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree layout basics.
//!
//! Builds a small tree, prints it in pre-order with indentation, then removes
//! one branch and shows which objects were reported.
//!
//! Run:
//! - `cargo run -p understory_demos --example tree_layout_basics`

use std::rc::Rc;

use understory_tree_layout::{LayoutError, TreeLayout};

fn dump(title: &str, layout: &TreeLayout<&'static str, Rc<String>>) {
    println!("== {title} ==");
    for (key, obj) in layout.iter() {
        let depth = layout.level_of(obj).unwrap_or(1) as usize;
        println!("{:indent$}{key} ({obj})", "", indent = (depth - 1) * 2);
    }
}

fn main() {
    let mut layout = TreeLayout::new();
    let node = |label: &str| Rc::new(label.to_string());

    let window = node("Window");
    let sidebar = node("Sidebar");
    let content = node("Content");
    let list = node("List");
    let row_a = node("Row A");
    let row_b = node("Row B");

    layout.save_root("window", Rc::clone(&window)).unwrap();
    layout.save("sidebar", Rc::clone(&sidebar), &window).unwrap();
    layout.save("content", Rc::clone(&content), &window).unwrap();
    layout.save("list", Rc::clone(&list), &content).unwrap();
    layout.save("row_a", Rc::clone(&row_a), &list).unwrap();
    layout.save("row_b", Rc::clone(&row_b), &list).unwrap();

    // Newest child first: `content` precedes `sidebar`, `row_b` precedes `row_a`.
    dump("initial", &layout);

    let path: Vec<_> = layout
        .path_to_root(&row_a)
        .unwrap()
        .into_iter()
        .map(|o| o.as_str())
        .collect();
    println!("path to Row A: {}", path.join(" > "));

    // Saving a second object under an existing key fails.
    let dup = layout.save("list", node("List 2"), &content);
    println!("duplicate key: {}", dup.unwrap_err());

    let mut removed = Vec::new();
    let count = layout.remove_by_key(&"content", |obj| removed.push(obj));
    println!("removed {count}: {removed:?}");
    dump("after removing content", &layout);

    match layout.parent_of(&row_b) {
        Err(e @ LayoutError::UnregisteredObject { .. }) => println!("Row B is gone: {e}"),
        other => println!("unexpected: {other:?}"),
    }
}
