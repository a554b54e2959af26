// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=reforest --heading-base-level=0

//! Reforest: declarative trees whose nodes know where they are and share what they know.
//!
//! Components in an [`Element`] tree call [`Cx::tree`] to position their children. Each
//! positioned node can read its [`IndexInfo`](reforest_index::IndexInfo) with
//! [`Cx::index`], contribute a payload to the nearest boundary's registry with
//! [`Cx::register`], and read values computed over the whole registry with
//! [`Cx::computed`]. The registry is flat, keyed by index path, and can always be rebuilt
//! into the nested [`TreeNode`](reforest_tree::TreeNode) structure. A boundary can carry data
//! of its own ([`TreeOptions::with_data`]), and built trees come back as [`RootTree`]s with
//! that data next to the children.
//!
//! Two runtimes evaluate the same element tree:
//!
//! - [`render_to_string`]: one-shot. Renders to completion, resolves every computed read
//!   against the complete registry, and re-renders until stable. Produces markup, the built
//!   trees, and a [`Handoff`] of computed values.
//! - [`Runtime`]: incremental. Keeps registries alive across updates, commits registration
//!   changes in batches, and recomputes only what a mutation invalidated. It can be
//!   [preloaded](Runtime::preload) with a handoff so a hydrating client agrees with the
//!   one-shot markup without recomputing.
//!
//! For a static tree both runtimes settle on the same computed values and the same markup.
//!
//! ## Example
//!
//! Later duplicates of an id are suppressed: only the first `"b"` renders.
//!
//! ```rust
//! use reforest::{Component, Element, Host, RenderOptions, Runtime, render_to_string};
//!
//! fn item(id: &'static str) -> Element<&'static str> {
//!     Component::new("Item", move |cx| {
//!         let (_, first) = cx.register_with(id, move |snapshot, own| {
//!             let first = snapshot.iter().find(|entry| entry.payload == id);
//!             first.is_some_and(|entry| entry.key == own)
//!         })?;
//!         Ok(if first == Some(true) {
//!             Host::new("li").child(id).into()
//!         } else {
//!             Element::Empty
//!         })
//!     })
//!     .into()
//! }
//!
//! let app: Element<&'static str> = Component::new("List", |cx| {
//!     let tree = cx.tree(["a", "b", "c", "b"].map(item))?;
//!     Ok(Host::new("ul").child(tree.children()).into())
//! })
//! .into();
//!
//! let one_shot = render_to_string(&app, &RenderOptions::default()).unwrap();
//! assert_eq!(one_shot.markup, "<ul><li>a</li><li>b</li><li>c</li></ul>");
//!
//! let mut runtime = Runtime::new(app, RenderOptions::default());
//! runtime.preload(one_shot.handoff.clone());
//! runtime.mount().unwrap();
//! assert_eq!(runtime.markup(), one_shot.markup);
//! assert_eq!(runtime.stats().reducer_runs, 0);
//! ```

pub mod cx;
pub mod element;
pub mod error;
pub mod handoff;
pub mod options;
pub mod render;
pub mod root;
pub mod runtime;

pub use cx::{Cx, NodeKey, Tree};
pub use element::{Component, Element, Host, Indexed, find_descendant};
pub use error::{BoxError, Error};
pub use handoff::{DATA_ID, Handoff};
pub use options::{DEFAULT_MAX_PASSES, RenderOptions, TreeOptions};
pub use render::{OneShotOutput, render_to_string};
pub use root::RootTree;
pub use runtime::{RenderStats, Runtime};

pub use reforest_index;
pub use reforest_tree;
