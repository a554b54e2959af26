// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use reforest::{Component, Element, RenderOptions, Runtime, render_to_string};
use reforest_index::IndexPath;
use reforest_tree::{Microtasks, NodeEntry, TreeMap, build_tree};

fn gen_entries(fanout: usize, depth: usize) -> Vec<NodeEntry<u32>> {
    let mut level = vec![IndexPath::root()];
    let mut out = Vec::new();
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for parent in &level {
            for i in 0..fanout {
                next.push(parent.child(i));
            }
        }
        for path in &next {
            out.push(NodeEntry::new(path.to_string(), path.clone(), out.len() as u32));
        }
        level = next;
    }
    // Deepest first, the worst case for insertion-order assumptions.
    out.reverse();
    out
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_tree");
    for &(fanout, depth) in &[(1000usize, 1usize), (10, 3), (4, 5)] {
        let entries = gen_entries(fanout, depth);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_function(format!("f{fanout}_d{depth}"), |b| {
            b.iter(|| black_box(build_tree(&entries)))
        });
    }
    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let entries = gen_entries(10, 3);
    group.throughput(Throughput::Elements(entries.len() as u64));
    group.bench_function("set_flush_snapshot", |b| {
        b.iter_batched(
            || {
                let tasks = Microtasks::new();
                (tasks.clone(), TreeMap::<u32>::new(tasks))
            },
            |(tasks, map)| {
                let _sub = map.subscribe(|snapshot| {
                    black_box(snapshot.len());
                });
                for entry in &entries {
                    map.set(entry.key.clone(), entry.index_path.clone(), entry.payload);
                }
                tasks.run_until_idle();
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn row(len: usize) -> Element<usize> {
    Component::new("Row", move |cx| {
        let cells = (0..len).map(|_| -> Element<usize> {
            Component::new("Cell", |cx| {
                let (_, rank) = cx.register_with(1, |snapshot, own| snapshot.position_of(own))?;
                Ok(Element::text(format!("{rank:?}")))
            })
            .into()
        });
        Ok(cx.tree(cells)?.into_children())
    })
    .into()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for &len in &[10usize, 100] {
        let app = row(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("one_shot_n{len}"), |b| {
            b.iter(|| black_box(render_to_string(&app, &RenderOptions::default()).unwrap()))
        });
        group.bench_function(format!("incremental_mount_n{len}"), |b| {
            b.iter_batched(
                || Runtime::new(app.clone(), RenderOptions::default()),
                |mut runtime| {
                    runtime.mount().unwrap();
                    black_box(runtime.stats());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_registry, bench_render);
criterion_main!(benches);
