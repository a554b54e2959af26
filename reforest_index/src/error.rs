// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while decoding index paths.

use alloc::string::String;

use thiserror::Error;

/// An index path string could not be decoded.
///
/// Index paths are produced by position assignment, never typed in by users, so
/// any of these errors points at a bug upstream of the codec rather than bad input.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string was empty.
    ///
    /// The aggregation root has no serialized form; callers must not ask to parse it.
    #[error("index path is empty")]
    Empty,

    /// One of the dot-separated segments is not a base-10 unsigned integer.
    #[error("index path `{input}` has a malformed segment `{segment}`")]
    MalformedSegment {
        /// The full path string that failed to parse.
        input: String,
        /// The offending segment.
        segment: String,
    },
}

impl PathError {
    /// Returns the offending segment if this is a segment error.
    pub fn segment(&self) -> Option<&str> {
        match self {
            Self::MalformedSegment { segment, .. } => Some(segment),
            Self::Empty => None,
        }
    }
}
