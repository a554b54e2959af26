// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position propagation: dense sibling positions for addressable children.
//!
//! ## Model
//!
//! A parent owns a [`Position`] (its path and its max-index path) and a list of direct
//! child slots in declared order. Each slot is classified through [`ChildSlot::kind`]:
//!
//! - [`SlotKind::Node`]: addressable; receives the next sibling position.
//! - [`SlotKind::Skip`]: text, null, or anything else that is rendered but never addressed.
//! - [`SlotKind::Fragment`]: a transparent grouping; its children continue the parent's
//!   counter as if they were declared inline.
//! - [`SlotKind::Wrapper`]: a keyed wrapper boundary; handled according to [`WrapperPolicy`].
//!
//! [`assign_positions`] returns one [`Placement`] per rendered slot, in the original order,
//! so callers can render skipped slots in place while only addressable nodes carry a path.
//!
//! ## Max-index paths
//!
//! The max-index path appends, per level, the highest valid sibling index (`count - 1`).
//! A parent with no addressable children appends nothing, so a query such as
//! [`IndexInfo::is_last`] below it sees no maximum and answers `false`.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::path::{INLINE_DEPTH, IndexPath};

/// Highest sibling index at each level, parallel to an [`IndexPath`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct MaxIndexPath(SmallVec<[usize; INLINE_DEPTH]>);

impl MaxIndexPath {
    /// The empty max path of the aggregation root.
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Build a max path from explicit segments.
    pub fn from_slice(segments: &[usize]) -> Self {
        Self(SmallVec::from_slice(segments))
    }

    /// The recorded maxima, outermost level first.
    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Highest sibling index recorded for the level at `depth` (1-based, like [`IndexPath::depth`]).
    pub fn at_depth(&self, depth: usize) -> Option<usize> {
        depth.checked_sub(1).and_then(|level| self.0.get(level).copied())
    }

    /// Extend with a level holding `child_count` addressable children.
    ///
    /// A count of zero leaves the path unchanged.
    pub fn with_level(&self, child_count: usize) -> Self {
        let mut segments = self.0.clone();
        if let Some(max) = child_count.checked_sub(1) {
            segments.push(max);
        }
        Self(segments)
    }
}

impl fmt::Debug for MaxIndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Where a node sits: its path and the sibling maxima along it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// Sibling positions from the aggregation root.
    pub path: IndexPath,
    /// Highest sibling index per level.
    pub max_path: MaxIndexPath,
}

impl Position {
    /// The position of the aggregation root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// True at the aggregation root.
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Index details for this position, or `None` at the aggregation root.
    pub fn info(&self) -> Option<IndexInfo> {
        IndexInfo::new(self)
    }
}

bitflags::bitflags! {
    /// Sibling-relative facts about a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct IndexFlags: u8 {
        /// First among its siblings.
        const FIRST = 0b0000_0001;
        /// Last among its siblings.
        const LAST  = 0b0000_0010;
        /// Position is even.
        const EVEN  = 0b0000_0100;
        /// Position is odd.
        const ODD   = 0b0000_1000;
    }
}

/// Index details of a positioned node, as read by the node itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexInfo {
    /// Position among siblings.
    pub index: usize,
    /// Full path from the aggregation root.
    pub index_path: IndexPath,
    /// Serialized [`IndexInfo::index_path`].
    pub index_path_string: String,
    /// Highest valid sibling index, if the parent level recorded one.
    pub max_index: Option<usize>,
    /// Highest sibling index per level.
    pub max_index_path: MaxIndexPath,
    /// First/last/even/odd facts.
    pub flags: IndexFlags,
}

impl IndexInfo {
    /// Derive index details from a position; `None` at the aggregation root.
    pub fn new(position: &Position) -> Option<Self> {
        let index = position.path.last()?;
        let max_index = position.max_path.at_depth(position.path.depth());
        let mut flags = IndexFlags::empty();
        flags.set(IndexFlags::FIRST, index == 0);
        flags.set(IndexFlags::LAST, max_index == Some(index));
        if index % 2 == 0 {
            flags |= IndexFlags::EVEN;
        } else {
            flags |= IndexFlags::ODD;
        }
        Some(Self {
            index,
            index_path_string: position.path.to_string(),
            index_path: position.path.clone(),
            max_index,
            max_index_path: position.max_path.clone(),
            flags,
        })
    }

    /// First among its siblings.
    pub fn is_first(&self) -> bool {
        self.flags.contains(IndexFlags::FIRST)
    }

    /// Last among its siblings; `false` when no maximum is known.
    pub fn is_last(&self) -> bool {
        self.flags.contains(IndexFlags::LAST)
    }

    /// Even position.
    pub fn is_even(&self) -> bool {
        self.flags.contains(IndexFlags::EVEN)
    }

    /// Odd position.
    pub fn is_odd(&self) -> bool {
        self.flags.contains(IndexFlags::ODD)
    }
}

/// How keyed wrapper boundaries contribute to paths.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapperPolicy {
    /// Wrapper children continue the enclosing sibling sequence.
    #[default]
    Flatten,
    /// The wrapper takes one position and its children nest one level deeper.
    Nest,
}

/// Classification of a child slot for position assignment.
#[derive(Debug)]
pub enum SlotKind<'a, S> {
    /// Addressable node that receives a position.
    Node,
    /// Rendered in place but never addressed.
    Skip,
    /// Transparent grouping, always flattened.
    Fragment(&'a [S]),
    /// Keyed wrapper boundary, flattened or nested per [`WrapperPolicy`].
    Wrapper(&'a [S]),
}

/// A child slot that can be classified for position assignment.
pub trait ChildSlot: Sized {
    /// Classify this slot.
    fn kind(&self) -> SlotKind<'_, Self>;
}

/// A child slot together with the position it was assigned, if any.
#[derive(Debug)]
pub enum Placement<'a, S> {
    /// Addressable node.
    Node {
        /// The child slot.
        slot: &'a S,
        /// Its assigned position.
        position: Position,
    },
    /// Slot rendered in place without a position.
    Passthrough {
        /// The child slot.
        slot: &'a S,
    },
    /// Keyed wrapper and the placements of its children.
    Wrapper {
        /// The wrapper slot.
        slot: &'a S,
        /// Present only under [`WrapperPolicy::Nest`].
        position: Option<Position>,
        /// Placements of the wrapped children.
        children: Vec<Placement<'a, S>>,
    },
}

impl<S> Placement<'_, S> {
    /// The position carried by this placement.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Node { position, .. } => Some(position),
            Self::Wrapper { position, .. } => position.as_ref(),
            Self::Passthrough { .. } => None,
        }
    }
}

/// Number of positions the slots occupy at this level.
pub fn count_addressable<S: ChildSlot>(children: &[S], policy: WrapperPolicy) -> usize {
    children
        .iter()
        .map(|slot| match slot.kind() {
            SlotKind::Node => 1,
            SlotKind::Skip => 0,
            SlotKind::Fragment(inner) => count_addressable(inner, policy),
            SlotKind::Wrapper(inner) => match policy {
                WrapperPolicy::Flatten => count_addressable(inner, policy),
                WrapperPolicy::Nest => 1,
            },
        })
        .sum()
}

/// Assign dense positions to the addressable children of `parent`.
///
/// Fragments are spliced into the surrounding sequence; every other slot yields exactly
/// one placement, in declared order.
pub fn assign_positions<'a, S: ChildSlot>(
    parent: &Position,
    children: &'a [S],
    policy: WrapperPolicy,
) -> Vec<Placement<'a, S>> {
    let level = Level {
        parent: &parent.path,
        max_path: parent
            .max_path
            .with_level(count_addressable(children, policy)),
        policy,
    };
    let mut next = 0;
    let mut out = Vec::with_capacity(children.len());
    level.place(children, &mut next, &mut out);
    out
}

struct Level<'p> {
    parent: &'p IndexPath,
    max_path: MaxIndexPath,
    policy: WrapperPolicy,
}

impl Level<'_> {
    fn next_position(&self, next: &mut usize) -> Position {
        let position = Position {
            path: self.parent.child(*next),
            max_path: self.max_path.clone(),
        };
        *next += 1;
        position
    }

    fn place<'a, S: ChildSlot>(
        &self,
        children: &'a [S],
        next: &mut usize,
        out: &mut Vec<Placement<'a, S>>,
    ) {
        for slot in children {
            match slot.kind() {
                SlotKind::Node => out.push(Placement::Node {
                    slot,
                    position: self.next_position(next),
                }),
                SlotKind::Skip => out.push(Placement::Passthrough { slot }),
                SlotKind::Fragment(inner) => self.place(inner, next, out),
                SlotKind::Wrapper(inner) => match self.policy {
                    WrapperPolicy::Flatten => {
                        let mut wrapped = Vec::with_capacity(inner.len());
                        self.place(inner, next, &mut wrapped);
                        out.push(Placement::Wrapper {
                            slot,
                            position: None,
                            children: wrapped,
                        });
                    }
                    WrapperPolicy::Nest => {
                        let position = self.next_position(next);
                        let children = assign_positions(&position, inner, self.policy);
                        out.push(Placement::Wrapper {
                            slot,
                            position: Some(position),
                            children,
                        });
                    }
                },
            }
        }
    }
}
