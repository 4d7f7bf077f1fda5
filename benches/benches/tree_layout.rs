// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_tree_layout::TreeLayout;

type Layout = TreeLayout<u32, Rc<u32>>;

/// Complete tree with `fanout` children per node and `depth` levels.
///
/// Keys are assigned breadth-first, so key 1 is the first child of the root.
fn gen_tree(fanout: u32, depth: u32) -> (Layout, Vec<Rc<u32>>) {
    let mut layout = Layout::new();
    let root = Rc::new(0);
    layout.save_root(0, Rc::clone(&root)).unwrap();
    let mut objects = vec![root];
    let mut frontier = vec![0_usize];
    let mut next_key = 1;
    for _ in 1..depth {
        let mut level = Vec::new();
        for &parent in &frontier {
            for _ in 0..fanout {
                let obj = Rc::new(next_key);
                let under = Rc::clone(&objects[parent]);
                layout.save(next_key, Rc::clone(&obj), &under).unwrap();
                level.push(objects.len());
                objects.push(obj);
                next_key += 1;
            }
        }
        frontier = level;
    }
    (layout, objects)
}

/// Degenerate tree: a single chain of `n` nodes.
fn gen_chain(n: u32) -> (Layout, Vec<Rc<u32>>) {
    let mut layout = Layout::new();
    let mut objects = vec![Rc::new(0)];
    layout.save_root(0, Rc::clone(&objects[0])).unwrap();
    for key in 1..n {
        let obj = Rc::new(key);
        let under = Rc::clone(&objects[key as usize - 1]);
        layout.save(key, Rc::clone(&obj), &under).unwrap();
        objects.push(obj);
    }
    (layout, objects)
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    for depth in [4_u32, 6, 8] {
        let (layout, _) = gen_tree(4, depth);
        group.throughput(Throughput::Elements(layout.len() as u64));
        group.bench_function(format!("fanout4_depth{depth}"), |b| {
            b.iter(|| black_box(gen_tree(4, depth)));
        });
    }
    group.bench_function("chain_4096", |b| {
        b.iter(|| black_box(gen_chain(4096)));
    });
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_by_key");
    for depth in [6_u32, 8] {
        // Key 1 roots a quarter of the tree.
        group.bench_function(format!("quarter_fanout4_depth{depth}"), |b| {
            b.iter_batched(
                || gen_tree(4, depth).0,
                |mut layout| black_box(layout.remove_by_key(&1, drop)),
                BatchSize::LargeInput,
            );
        });
        // The last key is a leaf.
        group.bench_function(format!("leaf_fanout4_depth{depth}"), |b| {
            b.iter_batched(
                || {
                    let (layout, objects) = gen_tree(4, depth);
                    let leaf = *objects[objects.len() - 1];
                    (layout, leaf)
                },
                |(mut layout, leaf)| black_box(layout.remove_by_key(&leaf, drop)),
                BatchSize::LargeInput,
            );
        });
    }
    group.bench_function("chain_4096_from_middle", |b| {
        b.iter_batched(
            || gen_chain(4096).0,
            |mut layout| black_box(layout.remove_by_key(&2048, drop)),
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let (layout, objects) = gen_tree(4, 7);
    group.throughput(Throughput::Elements(objects.len() as u64));
    group.bench_function("parent_of_all", |b| {
        b.iter(|| {
            for obj in &objects {
                black_box(layout.parent_of(obj).unwrap());
            }
        });
    });
    group.bench_function("path_to_root_leaves", |b| {
        b.iter(|| {
            for obj in objects.iter().rev().take(256) {
                black_box(layout.path_to_root(obj).unwrap());
            }
        });
    });
    group.bench_function("iter_preorder", |b| {
        b.iter(|| black_box(layout.iter().count()));
    });
    group.finish();
}

criterion_group!(benches, bench_save, bench_remove, bench_queries);
criterion_main!(benches);
