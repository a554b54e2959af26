// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for rendering, registration, and handoff.

use reforest_index::PathError;

/// Boxed error returned by a fallible reducer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the render runtimes and the [`Cx`](crate::Cx) API.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A registry operation ran with no tree boundary in scope.
    #[error("`{operation}` requires an enclosing tree boundary")]
    OutsideBoundary {
        /// The offending operation.
        operation: &'static str,
    },

    /// A node tried to register without having been given a position.
    #[error("`{operation}` requires a position assigned by an enclosing tree")]
    Unpositioned {
        /// The offending operation.
        operation: &'static str,
    },

    /// An index path failed to parse.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A user reducer failed.
    #[error("reducer for node `{key}` failed")]
    Reducer {
        /// Registry key of the node whose reducer failed.
        key: String,
        /// The reducer's error.
        #[source]
        source: BoxError,
    },

    /// Encoding or decoding JSON failed.
    #[error("handoff codec error")]
    Codec(#[from] serde_json::Error),

    /// Re-rendering kept changing computed values.
    #[error("rendering did not settle within {passes} passes")]
    NoConvergence {
        /// The pass limit that was reached.
        passes: usize,
    },
}

impl Error {
    /// Structural misuse of the API, as opposed to a data or reducer failure.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::OutsideBoundary { .. } | Self::Unpositioned { .. }
        )
    }

    /// True for [`Error::Reducer`].
    pub fn is_reducer(&self) -> bool {
        matches!(self, Self::Reducer { .. })
    }

    /// True for [`Error::NoConvergence`].
    pub fn is_no_convergence(&self) -> bool {
        matches!(self, Self::NoConvergence { .. })
    }

    pub(crate) fn reducer(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Reducer {
            key: key.into(),
            source: source.into(),
        }
    }
}
