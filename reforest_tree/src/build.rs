// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rebuilding the nested tree from flat registry entries.

use alloc::vec::Vec;

use hashbrown::HashMap;
use reforest_index::IndexPath;

use crate::map::NodeEntry;

/// A node of the rebuilt tree.
///
/// With the `serde` feature the payload's fields serialize next to `children`, and an empty
/// `children` list is omitted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TreeNode<T> {
    /// The node's payload.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub data: T,
    /// Child nodes in index path order.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// A node without children.
    pub fn leaf(data: T) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }

    /// True if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Nest flat entries by index path.
///
/// Entries sort by path first, so the output only depends on the set of entries. Each entry
/// attaches to the entry whose path is its parent path; if no such entry was registered it
/// becomes a top-level node. When two entries share a path, the first in key order receives
/// the children.
///
/// ```
/// use reforest_index::IndexPath;
/// use reforest_tree::{NodeEntry, build_tree};
///
/// let entries = [
///     NodeEntry::new("b", IndexPath::from_slice(&[1]), 'b'),
///     NodeEntry::new("a0", IndexPath::from_slice(&[0, 0]), 'x'),
///     NodeEntry::new("a", IndexPath::from_slice(&[0]), 'a'),
/// ];
/// let tree = build_tree(&entries);
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree[0].data, 'a');
/// assert_eq!(tree[0].children[0].data, 'x');
/// ```
pub fn build_tree<T: Clone>(entries: &[NodeEntry<T>]) -> Vec<TreeNode<T>> {
    let mut sorted: Vec<&NodeEntry<T>> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.index_path
            .cmp(&b.index_path)
            .then_with(|| a.key.cmp(&b.key))
    });

    // Arena of (entry, child ids); parents always precede their children after sorting.
    let mut arena: Vec<(&NodeEntry<T>, Vec<usize>)> = Vec::with_capacity(sorted.len());
    let mut by_path: HashMap<&IndexPath, usize> = HashMap::with_capacity(sorted.len());
    let mut top = Vec::new();
    for entry in sorted {
        let id = arena.len();
        arena.push((entry, Vec::new()));
        let parent = entry
            .index_path
            .parent()
            .and_then(|parent| by_path.get(&parent).copied());
        match parent {
            Some(parent) => arena[parent].1.push(id),
            None => {
                if entry.index_path.depth() > 1 {
                    tracing::trace!(
                        key = %entry.key,
                        path = %entry.index_path,
                        "parent not registered, attaching at top level"
                    );
                }
                top.push(id);
            }
        }
        by_path.entry(&entry.index_path).or_insert(id);
    }

    top.into_iter().map(|id| assemble(&arena, id)).collect()
}

fn assemble<T: Clone>(arena: &[(&NodeEntry<T>, Vec<usize>)], id: usize) -> TreeNode<T> {
    let (entry, children) = &arena[id];
    TreeNode {
        data: entry.payload.clone(),
        children: children.iter().map(|&child| assemble(arena, child)).collect(),
    }
}

/// Preorder walk over every payload in the tree.
pub fn flatten_tree<T>(nodes: &[TreeNode<T>]) -> Vec<&T> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(&node.data);
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Payloads of nodes without children, in preorder.
pub fn leaves<T>(nodes: &[TreeNode<T>]) -> Vec<&T> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            out.push(&node.data);
        }
        stack.extend(node.children.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use reforest_index::parse_index_path;

    fn entry(path: &str, name: &'static str) -> NodeEntry<&'static str> {
        NodeEntry::new(path, parse_index_path(path).unwrap(), name)
    }

    fn names(nodes: &[TreeNode<&'static str>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.data).collect()
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let tree = build_tree(&[entry("2", "c"), entry("0", "a"), entry("1", "b")]);
        assert_eq!(names(&tree), vec!["a", "b", "c"]);
        assert!(tree.iter().all(TreeNode::is_leaf));
    }

    #[test]
    fn nested_paths_nest() {
        let tree = build_tree(&[
            entry("0.1", "a1"),
            entry("1", "b"),
            entry("0", "a"),
            entry("0.0", "a0"),
        ]);
        assert_eq!(names(&tree), vec!["a", "b"]);
        assert_eq!(names(&tree[0].children), vec!["a0", "a1"]);
        assert!(tree[1].is_leaf());
    }

    #[test]
    fn numeric_sibling_order() {
        let entries: Vec<_> = (0..12_usize)
            .rev()
            .map(|i| NodeEntry::new(alloc::format!("k{i}"), IndexPath::from_slice(&[i]), i))
            .collect();
        let tree = build_tree(&entries);
        let order: Vec<usize> = tree.iter().map(|n| n.data).collect();
        assert_eq!(order, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn missing_parent_attaches_at_top() {
        let tree = build_tree(&[entry("0", "a"), entry("3.1", "orphan")]);
        assert_eq!(names(&tree), vec!["a", "orphan"]);
    }

    #[test]
    fn duplicate_paths_first_claims_children() {
        let entries = [
            NodeEntry::new("second", IndexPath::from_slice(&[0]), "second"),
            NodeEntry::new("first", IndexPath::from_slice(&[0]), "first"),
            NodeEntry::new("child", IndexPath::from_slice(&[0, 0]), "child"),
        ];
        let tree = build_tree(&entries);
        assert_eq!(names(&tree), vec!["first", "second"]);
        assert_eq!(names(&tree[0].children), vec!["child"]);
        assert!(tree[1].is_leaf());
    }

    #[test]
    fn walks() {
        let tree = build_tree(&[
            entry("0", "a"),
            entry("0.0", "a0"),
            entry("0.0.0", "a00"),
            entry("0.1", "a1"),
            entry("1", "b"),
        ]);
        let all: Vec<&str> = flatten_tree(&tree).into_iter().copied().collect();
        assert_eq!(all, vec!["a", "a0", "a00", "a1", "b"]);
        let tips: Vec<&str> = leaves(&tree).into_iter().copied().collect();
        assert_eq!(tips, vec!["a00", "a1", "b"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_flattened() {
        #[derive(Clone, serde::Serialize)]
        struct Fruit {
            name: &'static str,
        }
        let entries = [
            NodeEntry::new("0", IndexPath::from_slice(&[0]), Fruit { name: "pear" }),
            NodeEntry::new("0.0", IndexPath::from_slice(&[0, 0]), Fruit { name: "bosc" }),
        ];
        let json = serde_json::to_string(&build_tree(&entries)).unwrap();
        assert_eq!(json, r#"[{"name":"pear","children":[{"name":"bosc"}]}]"#);
    }
}
