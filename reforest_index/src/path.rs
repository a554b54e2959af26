// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index paths: parsing, formatting, and the numeric sibling order.
//!
//! An [`IndexPath`] lists sibling positions from the aggregation root down to a node.
//! Its serialized form joins the positions with `.` (for example `"2.0.3"`).
//!
//! ## Ordering
//!
//! Paths compare segment by segment by numeric value, never as strings, so `"2"` sorts
//! before `"10"`. A shorter path is padded with zeros for the comparison, which makes
//! `"1"` and `"1.0"` compare equal under [`compare_index_paths`]. The [`Ord`] impl on
//! [`IndexPath`] refines such ties by depth (ancestors first) so that sorting a set of
//! distinct paths always yields a single, insertion-independent order.

use alloc::string::{String, ToString};
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use smallvec::SmallVec;

use crate::error::PathError;

/// Number of levels stored inline before a path spills to the heap.
pub(crate) const INLINE_DEPTH: usize = 8;

/// Ordered sibling positions from the aggregation root to a node.
///
/// The empty path denotes the aggregation root itself.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexPath(SmallVec<[usize; INLINE_DEPTH]>);

impl IndexPath {
    /// The empty path of the aggregation root.
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Build a path from explicit segments.
    pub fn from_slice(segments: &[usize]) -> Self {
        Self(SmallVec::from_slice(segments))
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Number of levels below the aggregation root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True for the empty path of the aggregation root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Position among siblings, the trailing segment.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The path with `position` appended.
    pub fn child(&self, position: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(position);
        Self(segments)
    }

    /// The path with the trailing segment dropped, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self::from_slice(head))
    }

    /// True if `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.depth() < other.depth() && other.0.starts_with(&self.0)
    }

    /// Compare with zero padding on the shorter path.
    ///
    /// This is the order defined for path strings; see [`compare_index_paths`].
    pub fn cmp_padded(&self, other: &Self) -> Ordering {
        let len = self.depth().max(other.depth());
        for level in 0..len {
            let a = self.0.get(level).copied().unwrap_or(0);
            let b = other.0.get(level).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl Ord for IndexPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_padded(other)
            .then_with(|| self.depth().cmp(&other.depth()))
    }
}

impl PartialOrd for IndexPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.0.iter();
        if let Some(first) = segments.next() {
            write!(f, "{first}")?;
            for segment in segments {
                write!(f, ".{segment}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IndexPath")
            .field(&format_args!("{self}"))
            .finish()
    }
}

impl FromStr for IndexPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_index_path(s)
    }
}

impl From<&[usize]> for IndexPath {
    fn from(segments: &[usize]) -> Self {
        Self::from_slice(segments)
    }
}

/// Parse a dot-separated index path string.
///
/// Every segment must be a non-empty run of ASCII digits that fits in `usize`.
///
/// ```
/// use reforest_index::parse_index_path;
///
/// let path = parse_index_path("0.10.2").unwrap();
/// assert_eq!(path.segments(), &[0, 10, 2]);
/// assert!(parse_index_path("0.x").is_err());
/// ```
pub fn parse_index_path(input: &str) -> Result<IndexPath, PathError> {
    if input.is_empty() {
        return Err(PathError::Empty);
    }
    let mut segments = SmallVec::new();
    for segment in input.split('.') {
        segments.push(parse_segment(input, segment)?);
    }
    Ok(IndexPath(segments))
}

fn parse_segment(input: &str, segment: &str) -> Result<usize, PathError> {
    let malformed = || PathError::MalformedSegment {
        input: input.to_string(),
        segment: segment.to_string(),
    };
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    // Digits only, so the remaining failure mode is overflow.
    segment.parse().map_err(|_| malformed())
}

/// Serialize path segments in dot-joined form.
pub fn stringify_index_path(segments: &[usize]) -> String {
    IndexPath::from_slice(segments).to_string()
}

/// Compare two path strings numerically, padding the shorter one with zeros.
///
/// ```
/// use core::cmp::Ordering;
/// use reforest_index::compare_index_paths;
///
/// assert_eq!(compare_index_paths("2", "10"), Ok(Ordering::Less));
/// assert_eq!(compare_index_paths("1", "1.0"), Ok(Ordering::Equal));
/// ```
pub fn compare_index_paths(a: &str, b: &str) -> Result<Ordering, PathError> {
    let a = parse_index_path(a)?;
    let b = parse_index_path(b)?;
    Ok(a.cmp_padded(&b))
}

/// The path string of the parent level: `"2.0.3"` becomes `"2.0"`, `"4"` becomes `""`.
pub fn parent_path_string(path: &str) -> &str {
    path.rfind('.').map_or("", |dot| &path[..dot])
}
