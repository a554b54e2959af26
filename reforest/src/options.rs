// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render configuration.

use std::borrow::Cow;

use reforest_index::WrapperPolicy;

/// Passes allowed before a render gives up with [`Error::NoConvergence`](crate::Error::NoConvergence).
pub const DEFAULT_MAX_PASSES: usize = 16;

/// Options shared by [`render_to_string`](crate::render_to_string) and [`Runtime`](crate::Runtime).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Policy for keyed wrappers when a call site does not choose one.
    pub wrapper_policy: WrapperPolicy,
    /// Upper bound on render passes per settle.
    pub max_passes: usize,
    /// Prefix of generated root ids, as in `tree-0.1`.
    pub root_prefix: Cow<'static, str>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wrapper_policy: WrapperPolicy::Flatten,
            max_passes: DEFAULT_MAX_PASSES,
            root_prefix: Cow::Borrowed("tree"),
        }
    }
}

impl RenderOptions {
    /// Set [`RenderOptions::wrapper_policy`].
    pub fn with_wrapper_policy(mut self, policy: WrapperPolicy) -> Self {
        self.wrapper_policy = policy;
        self
    }

    /// Set [`RenderOptions::max_passes`].
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Set [`RenderOptions::root_prefix`].
    pub fn with_root_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.root_prefix = prefix.into();
        self
    }
}

/// Per call site options for [`Cx::tree_with`](crate::Cx::tree_with).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeOptions<T> {
    /// Overrides [`RenderOptions::wrapper_policy`] for these children.
    pub wrapper_policy: Option<WrapperPolicy>,
    /// Payload the calling node registers for itself when the call is nested.
    ///
    /// At a new boundary this is the root's own data, returned with its built tree as
    /// [`RootTree::data`](crate::RootTree::data).
    pub data: Option<T>,
}

impl<T> Default for TreeOptions<T> {
    fn default() -> Self {
        Self {
            wrapper_policy: None,
            data: None,
        }
    }
}

impl<T> TreeOptions<T> {
    /// Options that carry `data` for the calling node.
    pub fn with_data(data: T) -> Self {
        Self {
            wrapper_policy: None,
            data: Some(data),
        }
    }

    /// Set [`TreeOptions::wrapper_policy`].
    pub fn wrapper_policy(mut self, policy: WrapperPolicy) -> Self {
        self.wrapper_policy = Some(policy);
        self
    }
}
