// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=reforest_tree --heading-base-level=0

//! Reforest Tree: an observable node registry and tree reconstruction from index paths.
//!
//! Nodes in a rendered tree register themselves under a key together with their
//! [`IndexPath`](reforest_index::IndexPath) and a payload. The registry keeps the flat set,
//! and consumers read sorted [`Snapshot`]s or the nested [`TreeNode`] structure rebuilt by
//! [`build_tree`].
//!
//! - [`TreeMap`]: the shared registry. Mutations apply immediately; subscribers are notified
//!   once per batch when the owning [`Microtasks`] queue drains.
//! - [`Subscription`]: idempotent unsubscribe handle, also released on drop.
//! - [`Derived`]: a reducer over snapshots that only reports structurally different outputs.
//! - [`Barrier`] and [`Deferred`]: one-shot resolution of aggregate reads once a full pass
//!   has registered every node.
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use reforest_index::parse_index_path;
//! use reforest_tree::{Microtasks, TreeMap};
//!
//! let tasks = Microtasks::new();
//! let fruit = TreeMap::new(tasks.clone());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = fruit.subscribe(move |snapshot| {
//!     sink.borrow_mut().push(snapshot.keys().map(String::from).collect::<Vec<_>>());
//! });
//!
//! fruit.set("pear", parse_index_path("1").unwrap(), "Pear");
//! fruit.set("bosc", parse_index_path("1.0").unwrap(), "Bosc");
//! fruit.set("apple", parse_index_path("0").unwrap(), "Apple");
//! tasks.run_until_idle();
//!
//! // One notification for the whole batch, in path order.
//! assert_eq!(*seen.borrow(), vec![vec!["apple", "pear", "bosc"]]);
//!
//! let tree = fruit.snapshot().tree();
//! assert_eq!(tree[1].data, "Pear");
//! assert_eq!(tree[1].children[0].data, "Bosc");
//! ```
//!
//! This crate is `no_std` and uses `alloc`. It is single-threaded: handles are `Rc`-based
//! and neither `Send` nor `Sync`.

#![no_std]

extern crate alloc;

pub mod barrier;
pub mod build;
pub mod derived;
pub mod map;
pub mod microtask;
pub mod subscribe;

pub use barrier::{Barrier, Compute, Deferred};
pub use build::{TreeNode, build_tree, flatten_tree, leaves};
pub use derived::Derived;
pub use map::{NodeEntry, Snapshot, TreeMap};
pub use microtask::Microtasks;
pub use subscribe::Subscription;
