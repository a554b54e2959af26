// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built tree of one boundary, together with the boundary's own data.

use reforest_tree::TreeNode;
use serde::Serialize;

/// A boundary's data merged with the tree built from its registry.
///
/// Serializes like a [`TreeNode`]: the data's fields sit next to `children`.
///
/// ```
/// use reforest::RootTree;
/// use reforest_tree::TreeNode;
///
/// #[derive(Clone, serde::Serialize)]
/// struct Menu {
///     title: &'static str,
/// }
///
/// let root = RootTree {
///     data: Some(Menu { title: "File" }),
///     children: vec![TreeNode::leaf(Menu { title: "Open" })],
/// };
/// assert_eq!(
///     serde_json::to_string(&root).unwrap(),
///     r#"{"title":"File","children":[{"title":"Open"}]}"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RootTree<T> {
    /// Data given by the node that opened the boundary, if any.
    #[serde(flatten)]
    pub data: Option<T>,
    /// Top-level nodes built from the registry.
    pub children: Vec<TreeNode<T>>,
}

impl<T> RootTree<T> {
    /// True if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
