// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Computed values carried from a one-shot render to a long-lived runtime.
//!
//! The blob is a JSON object mapping root id to an object mapping computed key to value:
//!
//! ```json
//! {"tree-0":{"0":true,"1":true,"3":false}}
//! ```
//!
//! It travels inside the rendered document as
//! `<script id="__REFOREST_DATA__" type="application/json">…</script>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Element id of the script that carries the blob.
pub const DATA_ID: &str = "__REFOREST_DATA__";

/// Computed values per root and key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handoff {
    roots: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Handoff {
    /// An empty handoff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode as JSON.
    pub fn stringify(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON produced by [`Handoff::stringify`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// The blob wrapped in its script element.
    ///
    /// `</` is escaped so payload strings cannot close the script early.
    ///
    /// ```
    /// use reforest::Handoff;
    ///
    /// let mut handoff = Handoff::new();
    /// handoff.insert("tree-0", "1", serde_json::json!("</script>"));
    /// let script = handoff.initializer_script().unwrap();
    /// assert!(script.starts_with(r#"<script id="__REFOREST_DATA__""#));
    /// assert_eq!(Handoff::extract(&script), Some(handoff));
    /// ```
    pub fn initializer_script(&self) -> Result<String, Error> {
        let json = self.stringify()?.replace("</", "<\\/");
        Ok(format!(
            r#"<script id="{DATA_ID}" type="application/json">{json}</script>"#
        ))
    }

    /// Recover a handoff embedded in `document` by [`Handoff::initializer_script`].
    ///
    /// A missing blob yields `None` quietly; an unparsable one is logged and ignored so the
    /// caller falls back to recomputing.
    pub fn extract(document: &str) -> Option<Self> {
        let open = format!(r#"<script id="{DATA_ID}" type="application/json">"#);
        let start = document.find(&open)? + open.len();
        let Some(len) = document[start..].find("</script>") else {
            tracing::warn!("handoff script is not terminated");
            return None;
        };
        match Self::from_json(&document[start..start + len]) {
            Ok(handoff) => Some(handoff),
            Err(error) => {
                tracing::warn!(%error, "ignoring unparsable handoff");
                None
            }
        }
    }

    /// Value stored for `key` under `root`.
    pub fn get(&self, root: &str, key: &str) -> Option<&Value> {
        self.roots.get(root)?.get(key)
    }

    /// Store a value.
    pub fn insert(&mut self, root: impl Into<String>, key: impl Into<String>, value: Value) {
        self.roots
            .entry(root.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Remove and return a value. Roots left empty are dropped.
    pub fn remove(&mut self, root: &str, key: &str) -> Option<Value> {
        let keys = self.roots.get_mut(root)?;
        let value = keys.remove(key);
        if keys.is_empty() {
            self.roots.remove(root);
        }
        value
    }

    /// True if any value is stored for `root`.
    pub fn has_root(&self, root: &str) -> bool {
        self.roots.contains_key(root)
    }

    /// Root ids in order.
    pub fn roots(&self) -> impl Iterator<Item = &str> + '_ {
        self.roots.keys().map(String::as_str)
    }

    /// Keys and values stored for `root`.
    pub fn entries(&self, root: &str) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.roots
            .get(root)
            .into_iter()
            .flat_map(|keys| keys.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.roots.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
