// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-component context: index reads, registration, and computed data.
//!
//! Every component render receives a [`Cx`] describing where it sits: the [`Position`]
//! assigned by the nearest indexed parent and the tree boundary, if any, that its
//! registrations go to. The context is passed explicitly down the render, one scope per
//! component, so independent roots can never see each other's state.

use std::fmt;
use std::rc::Rc;

use reforest_index::{IndexInfo, IndexPath, Position, parse_index_path};
use reforest_tree::{Snapshot, TreeMap};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::element::{Element, Indexed};
use crate::error::{BoxError, Error};
use crate::options::{RenderOptions, TreeOptions};

/// A reducer with its output already encoded as JSON.
pub(crate) type ReducerFn<T> = Rc<dyn Fn(&Snapshot<T>) -> Result<Value, Error>>;

/// What a render pass does with registrations and computed reads.
///
/// The one-shot renderer defers computed reads until the registry is complete; the
/// incremental runtime serves them from its cache and stages registrations for commit.
pub(crate) trait Driver<T> {
    /// Make sure a registry exists for `root` in this pass, carrying the boundary's own data.
    fn open_root(&mut self, root: &Rc<str>, data: Option<T>);

    /// The registry for `root` if it is open.
    fn tree_map(&self, root: &str) -> Option<TreeMap<T>>;

    /// Record a node's payload under `key`.
    fn register(&mut self, root: &Rc<str>, key: String, path: IndexPath, payload: T);

    /// Ordinal of the next computed read at `path` under `root` in this pass.
    fn next_read(&mut self, root: &Rc<str>, path: &str) -> usize;

    /// The value of the reducer filed under `key`, if one is available yet.
    fn computed(
        &mut self,
        root: &Rc<str>,
        key: String,
        reducer: ReducerFn<T>,
    ) -> Result<Option<Value>, Error>;
}

/// Where a render call sits.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    /// Position assigned by the nearest indexed parent.
    pub(crate) position: Position,
    /// Boundary that registrations go to.
    pub(crate) root: Option<Rc<str>>,
    /// Structural slot of the element, used to name new roots.
    pub(crate) slot: IndexPath,
}

impl Scope {
    pub(crate) fn app() -> Self {
        Self {
            slot: IndexPath::from_slice(&[0]),
            ..Self::default()
        }
    }

    pub(crate) fn at_slot(&self, slot: IndexPath) -> Self {
        Self {
            slot,
            ..self.clone()
        }
    }
}

/// Identity of a registered node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    root: Rc<str>,
    key: String,
}

impl NodeKey {
    /// Id of the boundary the node registered into.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Registry key within the root; the node's index path string.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The registry key parsed back into a path.
    pub fn index_path(&self) -> Result<IndexPath, Error> {
        Ok(parse_index_path(&self.key)?)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root, self.key)
    }
}

/// Children prepared by [`Cx::tree`].
#[derive(Debug)]
pub struct Tree<T> {
    children: Element<T>,
    root: Rc<str>,
    map: TreeMap<T>,
    is_root: bool,
}

impl<T> Tree<T> {
    /// The positioned children, ready to be returned or placed in markup.
    pub fn children(&self) -> Element<T> {
        self.children.clone()
    }

    /// Consume the handle, returning the positioned children.
    pub fn into_children(self) -> Element<T> {
        self.children
    }

    /// True if this call created the boundary rather than joining an enclosing one.
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Id of the boundary the children register into.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Registry the children register into.
    pub fn tree_map(&self) -> &TreeMap<T> {
        &self.map
    }
}

/// Context handed to a component's render function.
pub struct Cx<'a, T> {
    driver: &'a mut dyn Driver<T>,
    options: &'a RenderOptions,
    scope: Scope,
    roots_opened: usize,
}

impl<T> fmt::Debug for Cx<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("path", &self.scope.position.path)
            .field("root", &self.scope.root)
            .field("slot", &self.scope.slot)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Clone + 'static> Cx<'a, T> {
    pub(crate) fn new(
        driver: &'a mut dyn Driver<T>,
        options: &'a RenderOptions,
        scope: Scope,
    ) -> Self {
        Self {
            driver,
            options,
            scope,
            roots_opened: 0,
        }
    }

    /// Index details of this node, or `None` when no indexed parent positioned it.
    pub fn index(&self) -> Option<IndexInfo> {
        self.scope.position.info()
    }

    /// This node's position.
    pub fn position(&self) -> &Position {
        &self.scope.position
    }

    /// Id of the enclosing boundary.
    pub fn root_id(&self) -> Option<&str> {
        self.scope.root.as_deref()
    }

    /// Position `children` below this node without touching any registry.
    pub fn indexed_children(&self, children: impl IntoIterator<Item = Element<T>>) -> Element<T> {
        Element::Indexed(Indexed {
            children: children.into_iter().collect(),
            base: self.scope.position.clone(),
            policy: self.options.wrapper_policy,
            root: self.scope.root.clone(),
        })
    }

    /// Position `children` and make a registry available to them.
    ///
    /// Outside any boundary this creates one, and the children's paths start at the root.
    /// The new boundary covers only `children`; the calling node stays outside it, and each
    /// such call opens its own registry. Inside a boundary the enclosing registry is reused
    /// and the children nest below this node's path.
    pub fn tree(
        &mut self,
        children: impl IntoIterator<Item = Element<T>>,
    ) -> Result<Tree<T>, Error> {
        self.tree_with(children, TreeOptions::default())
    }

    /// [`Cx::tree`] with per call site options.
    pub fn tree_with(
        &mut self,
        children: impl IntoIterator<Item = Element<T>>,
        options: TreeOptions<T>,
    ) -> Result<Tree<T>, Error> {
        let policy = options.wrapper_policy.unwrap_or(self.options.wrapper_policy);
        let children = children.into_iter().collect();
        let (root, base, is_root) = match self.scope.root.clone() {
            Some(root) => {
                if let Some(data) = options.data {
                    self.register(data)?;
                }
                (root, self.scope.position.clone(), false)
            }
            None => {
                let root = self.next_root_id();
                self.driver.open_root(&root, options.data);
                tracing::debug!(root = %root, "tree boundary opened");
                (root, Position::root(), true)
            }
        };
        let map = self.driver.tree_map(&root).ok_or(Error::OutsideBoundary {
            operation: "tree",
        })?;
        Ok(Tree {
            children: Element::Indexed(Indexed {
                children,
                base,
                policy,
                root: Some(root.clone()),
            }),
            root,
            map,
            is_root,
        })
    }

    /// Register `payload` for this node, returning its key.
    pub fn register(&mut self, payload: T) -> Result<NodeKey, Error> {
        let root = self.scope.root.clone().ok_or(Error::OutsideBoundary {
            operation: "register",
        })?;
        if self.scope.position.is_root() {
            return Err(Error::Unpositioned {
                operation: "register",
            });
        }
        let path = self.scope.position.path.clone();
        let key = path.to_string();
        self.driver.register(&root, key.clone(), path, payload);
        Ok(NodeKey { root, key })
    }

    /// Compute a value over the enclosing registry.
    ///
    /// Returns `None` while the value is not yet known: during the first pass of a one-shot
    /// render, or before the incremental runtime has run the reducer.
    pub fn computed<C>(
        &mut self,
        reducer: impl Fn(&Snapshot<T>) -> C + 'static,
    ) -> Result<Option<C>, Error>
    where
        C: Serialize + DeserializeOwned,
    {
        self.try_computed(move |snapshot| Ok::<_, std::convert::Infallible>(reducer(snapshot)))
    }

    /// [`Cx::computed`] with a fallible reducer.
    ///
    /// A reducer error surfaces as [`Error::Reducer`] from the render entry point.
    pub fn try_computed<C, E>(
        &mut self,
        reducer: impl Fn(&Snapshot<T>) -> Result<C, E> + 'static,
    ) -> Result<Option<C>, Error>
    where
        C: Serialize + DeserializeOwned,
        E: Into<BoxError>,
    {
        let root = self.scope.root.clone().ok_or(Error::OutsideBoundary {
            operation: "computed",
        })?;
        let key = self.next_computed_key(&root);
        let error_key = key.clone();
        let reducer: ReducerFn<T> = Rc::new(move |snapshot: &Snapshot<T>| {
            let value = reducer(snapshot).map_err(|e| Error::reducer(error_key.clone(), e))?;
            Ok(serde_json::to_value(value)?)
        });
        match self.driver.computed(&root, key, reducer)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Register `payload` and compute a value that may depend on this node's own key.
    pub fn register_with<C>(
        &mut self,
        payload: T,
        reducer: impl Fn(&Snapshot<T>, &str) -> C + 'static,
    ) -> Result<(NodeKey, Option<C>), Error>
    where
        C: Serialize + DeserializeOwned,
    {
        let key = self.register(payload)?;
        let own = key.key.clone();
        let value = self.computed(move |snapshot| reducer(snapshot, &own))?;
        Ok((key, value))
    }

    /// Handle to the enclosing registry.
    pub fn tree_map(&self) -> Result<TreeMap<T>, Error> {
        self.scope
            .root
            .as_deref()
            .and_then(|root| self.driver.tree_map(root))
            .ok_or(Error::OutsideBoundary {
                operation: "tree_map",
            })
    }

    // The first read at a path is keyed by the path; later reads at the same path in the
    // same pass, from this node or any component rendered in its place, get an ordinal.
    fn next_computed_key(&mut self, root: &Rc<str>) -> String {
        let path = self.scope.position.path.to_string();
        match self.driver.next_read(root, &path) {
            0 => path,
            n => format!("{path}#{n}"),
        }
    }

    // Root ids follow the element slot; further roots opened by the same node get an ordinal.
    fn next_root_id(&mut self) -> Rc<str> {
        let n = self.roots_opened;
        self.roots_opened += 1;
        let (prefix, slot) = (&self.options.root_prefix, &self.scope.slot);
        match n {
            0 => format!("{prefix}-{slot}").into(),
            n => format!("{prefix}-{slot}#{n}").into(),
        }
    }
}
