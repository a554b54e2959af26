// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use reforest_index::{IndexPath, compare_index_paths, parse_index_path};

/// Paths of a tree with `fanout` children per node, `depth` levels deep, in shuffled order.
fn gen_paths(fanout: usize, depth: usize, seed: u64) -> Vec<IndexPath> {
    let mut level = vec![IndexPath::root()];
    let mut out = Vec::new();
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for parent in &level {
            for i in 0..fanout {
                next.push(parent.child(i));
            }
        }
        out.extend(next.iter().cloned());
        level = next;
    }
    out.shuffle(&mut StdRng::seed_from_u64(seed));
    out
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    for &(fanout, depth) in &[(100usize, 1usize), (10, 3), (4, 6)] {
        let paths = gen_paths(fanout, depth, 0x5eed);
        let strings: Vec<String> = paths.iter().map(ToString::to_string).collect();
        group.throughput(Throughput::Elements(paths.len() as u64));
        group.bench_function(format!("ord_f{fanout}_d{depth}"), |b| {
            b.iter_batched(
                || paths.clone(),
                |mut paths| {
                    paths.sort();
                    black_box(paths);
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("strings_f{fanout}_d{depth}"), |b| {
            b.iter_batched(
                || strings.clone(),
                |mut strings| {
                    strings.sort_by(|a, b| compare_index_paths(a, b).unwrap());
                    black_box(strings);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let strings: Vec<String> = gen_paths(4, 6, 7).iter().map(ToString::to_string).collect();
    group.throughput(Throughput::Elements(strings.len() as u64));
    group.bench_function("parse_index_path", |b| {
        b.iter(|| {
            let mut depth = 0;
            for s in &strings {
                depth += parse_index_path(s).unwrap().depth();
            }
            black_box(depth)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_sort, bench_parse);
criterion_main!(benches);
