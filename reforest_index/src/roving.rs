// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Roving index: an active position that moves within sibling bounds.
//!
//! Typical use is keyboard navigation across the children of one level, where the
//! upper bound comes from [`IndexInfo::max_index`](crate::IndexInfo::max_index).
//!
//! ```
//! use reforest_index::{RovingIndex, RovingOptions};
//!
//! let mut roving = RovingIndex::new(RovingOptions {
//!     max_index: Some(2),
//!     wrap: true,
//!     ..RovingOptions::default()
//! });
//! roving.move_backward();
//! assert_eq!(roving.active(), 2);
//! roving.move_forward();
//! assert_eq!(roving.active(), 0);
//! ```

/// Bounds and edge behavior of a [`RovingIndex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RovingOptions {
    /// Index used when first created.
    pub default_index: usize,
    /// Highest valid index; `None` leaves the upper end open.
    pub max_index: Option<usize>,
    /// Clamp moves to `0..=max_index`.
    pub contain: bool,
    /// Wrap around both ends instead of clamping. Requires `max_index`.
    pub wrap: bool,
}

impl Default for RovingOptions {
    fn default() -> Self {
        Self {
            default_index: 0,
            max_index: None,
            contain: true,
            wrap: false,
        }
    }
}

/// An active index that is contained or wraps at the bounds.
///
/// The index never goes below zero, regardless of [`RovingOptions::contain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RovingIndex {
    active: usize,
    options: RovingOptions,
}

impl RovingIndex {
    /// Create a roving index positioned at the (normalized) default index.
    pub fn new(options: RovingOptions) -> Self {
        let mut roving = Self {
            active: 0,
            options,
        };
        roving.set(options.default_index);
        roving
    }

    /// The active index.
    pub fn active(&self) -> usize {
        self.active
    }

    /// The options in effect.
    pub fn options(&self) -> RovingOptions {
        self.options
    }

    /// Set the active index, wrapping or clamping it into bounds.
    pub fn set(&mut self, index: usize) {
        self.active = match self.wrap_len() {
            Some(len) => index % len,
            None => self.contain(index),
        };
    }

    /// Move the active index by a positive or negative amount.
    pub fn move_by(&mut self, amount: isize) {
        if self.wraps_whole_range() {
            self.active = self.active.wrapping_add_signed(amount);
            return;
        }
        self.active = match self.wrap_len() {
            // `active < len` holds here, so neither branch can overflow.
            Some(len) => {
                let step = amount.unsigned_abs() % len;
                if amount >= 0 {
                    if step >= len - self.active {
                        step - (len - self.active)
                    } else {
                        self.active + step
                    }
                } else if step <= self.active {
                    self.active - step
                } else {
                    self.active + (len - step)
                }
            }
            None => match self.active.checked_add_signed(amount) {
                Some(next) => self.contain(next),
                None if amount < 0 => 0,
                None => self.contain(usize::MAX),
            },
        };
    }

    /// Move one position forward.
    pub fn move_forward(&mut self) {
        self.move_by(1);
    }

    /// Move one position backward.
    pub fn move_backward(&mut self) {
        self.move_by(-1);
    }

    /// True when the active index sits at the lower bound.
    pub fn move_backward_disabled(&self) -> bool {
        self.active == 0
    }

    /// True when the active index sits at (or past) the upper bound.
    pub fn move_forward_disabled(&self) -> bool {
        self.options.max_index.is_some_and(|max| self.active >= max)
    }

    /// Change the upper bound, re-normalizing the active index.
    pub fn set_max_index(&mut self, max_index: Option<usize>) {
        self.options.max_index = max_index;
        self.set(self.active);
    }

    fn wrap_len(&self) -> Option<usize> {
        match self.options.max_index {
            Some(max) if self.options.wrap => max.checked_add(1),
            _ => None,
        }
    }

    fn wraps_whole_range(&self) -> bool {
        self.options.wrap && self.options.max_index == Some(usize::MAX)
    }

    fn contain(&self, index: usize) -> usize {
        match self.options.max_index {
            Some(max) if self.options.contain => index.min(max),
            _ => index,
        }
    }
}
