// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=reforest_index --heading-base-level=0

//! Reforest Index: index paths and sibling positions for declaratively nested trees.
//!
//! Every addressable node in a rendered tree gets a stable, dot-separated index path that
//! reflects its position among siblings and ancestors (`"2.0.3"`).
//! This crate is the leaf of the Reforest stack and knows nothing about registries or rendering.
//!
//! - [`IndexPath`] plus [`parse_index_path`] / [`compare_index_paths`]: the path codec and the
//!   numeric (not lexicographic) total order used for sibling and rendering order everywhere.
//! - [`Position`], [`MaxIndexPath`], [`IndexInfo`]: a node's place and its first/last/even/odd facts.
//! - [`assign_positions`] over any [`ChildSlot`]: dense positions for addressable children,
//!   skipping text and flattening fragments, with a [`WrapperPolicy`] for keyed wrappers.
//! - [`RovingIndex`]: a contained or wrapping active index for keyboard-style navigation.
//!
//! ## Example
//!
//! ```rust
//! use reforest_index::{
//!     ChildSlot, Placement, Position, SlotKind, WrapperPolicy, assign_positions,
//! };
//!
//! enum Child {
//!     Item(&'static str),
//!     Text(&'static str),
//! }
//!
//! impl ChildSlot for Child {
//!     fn kind(&self) -> SlotKind<'_, Self> {
//!         match self {
//!             Child::Item(_) => SlotKind::Node,
//!             Child::Text(_) => SlotKind::Skip,
//!         }
//!     }
//! }
//!
//! let children = [Child::Text("Fruit:"), Child::Item("apple"), Child::Item("orange")];
//! let placed = assign_positions(&Position::root(), &children, WrapperPolicy::Flatten);
//!
//! // Text keeps its slot but takes no position.
//! assert!(matches!(placed[0], Placement::Passthrough { .. }));
//!
//! let orange = placed[2].position().unwrap().info().unwrap();
//! assert_eq!(orange.index_path_string, "1");
//! assert!(orange.is_last() && orange.is_odd());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod error;
pub mod path;
pub mod position;
pub mod roving;

pub use error::PathError;
pub use path::{
    IndexPath, compare_index_paths, parent_path_string, parse_index_path, stringify_index_path,
};
pub use position::{
    ChildSlot, IndexFlags, IndexInfo, MaxIndexPath, Placement, Position, SlotKind, WrapperPolicy,
    assign_positions, count_addressable,
};
pub use roving::{RovingIndex, RovingOptions};
