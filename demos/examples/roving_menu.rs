// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Roving menu.
//!
//! Keyboard-style navigation over registered menu items: the roving index is bounded by
//! the highest index the registry reports.
//!
//! Run:
//! - `cargo run -p reforest_demos --example roving_menu`

use reforest_index::{RovingIndex, RovingOptions, parse_index_path};
use reforest_tree::{Microtasks, TreeMap};

fn main() {
    let tasks = Microtasks::new();
    let menu = TreeMap::new(tasks.clone());
    for (i, label) in ["Open", "Save", "Export", "Quit"].into_iter().enumerate() {
        let path = parse_index_path(&i.to_string()).expect("path");
        menu.set(path.to_string(), path, label);
    }
    tasks.run_until_idle();

    let snapshot = menu.snapshot();
    let mut roving = RovingIndex::new(RovingOptions {
        max_index: snapshot.len().checked_sub(1),
        wrap: true,
        ..RovingOptions::default()
    });

    let show = |roving: &RovingIndex| {
        let entry = &snapshot.entries()[roving.active()];
        println!("active {} ({})", entry.index_path, entry.payload);
    };
    show(&roving);
    for _ in 0..5 {
        roving.move_forward();
        show(&roving);
    }
    roving.move_backward();
    show(&roving);
}
