// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markup rendering and the one-shot runtime.
//!
//! ## One-shot passes
//!
//! [`render_to_string`] renders the whole element tree synchronously. During a pass every
//! node registers, and every computed read files a request with its root's
//! [`Barrier`]. When the pass returns, the registry is complete: each barrier resolves
//! its requests together against the final snapshot of its root.
//!
//! Reads in the first pass return `None`. If any resolved value differs from what its
//! reader was served, the tree renders again with the resolved values, until every read
//! sees exactly what the complete registry produces. The last pass's values become the
//! [`Handoff`].
//!
//! Reads are keyed by the reader's index path. Further reads at the same path in a pass,
//! such as a component rendering a reading child in its own place, get `path#1`, `path#2`
//! and so on, in render order.

use std::collections::BTreeMap;
use std::rc::Rc;

use hashbrown::HashMap;
use reforest_index::{IndexPath, Placement, assign_positions};
use reforest_tree::{Barrier, Deferred, Microtasks, Snapshot, TreeMap};
use serde_json::Value;

use crate::cx::{Cx, Driver, ReducerFn, Scope};
use crate::element::{Element, Host, Indexed};
use crate::error::Error;
use crate::handoff::Handoff;
use crate::options::RenderOptions;
use crate::root::RootTree;

/// Result of [`render_to_string`].
#[derive(Clone, Debug)]
pub struct OneShotOutput<T> {
    /// Rendered markup of the final pass.
    pub markup: String,
    /// Computed values of the final pass, keyed as the incremental runtime keys them.
    pub handoff: Handoff,
    /// Built tree of every root, with the root's own data, by root id.
    pub trees: BTreeMap<String, RootTree<T>>,
    /// Passes rendered.
    pub passes: usize,
}

impl<T> OneShotOutput<T> {
    /// Markup followed by the handoff script.
    pub fn document(&self) -> Result<String, Error> {
        Ok(format!("{}{}", self.markup, self.handoff.initializer_script()?))
    }
}

/// Render `app` to completion.
///
/// ```
/// use reforest::{Component, Element, Host, RenderOptions, render_to_string};
///
/// fn item(name: &'static str) -> Element<&'static str> {
///     Component::new("Item", move |cx| {
///         cx.register(name)?;
///         let count = cx.computed(|snapshot| snapshot.len())?;
///         let label = match count {
///             Some(count) => format!("{name} of {count}"),
///             None => name.to_string(),
///         };
///         Ok(Host::new("li").child(label).into())
///     })
///     .into()
/// }
///
/// let list = Component::new("List", |cx| {
///     let tree = cx.tree([item("apple"), item("pear")])?;
///     Ok(Host::new("ul").child(tree.children()).into())
/// });
///
/// let out = render_to_string(&list.into(), &RenderOptions::default()).unwrap();
/// assert_eq!(out.markup, "<ul><li>apple of 2</li><li>pear of 2</li></ul>");
/// assert_eq!(out.passes, 2);
/// ```
pub fn render_to_string<T: Clone + 'static>(
    app: &Element<T>,
    options: &RenderOptions,
) -> Result<OneShotOutput<T>, Error> {
    let mut served = Handoff::new();
    for pass in 1..=options.max_passes {
        let mut driver = OneShotDriver::new(served);
        let markup = render_root(&mut driver, options, app)?;
        let resolved = driver.resolve()?;
        let changed = resolved != driver.served;
        tracing::debug!(
            pass,
            roots = driver.roots.len(),
            reads = resolved.len(),
            changed,
            "one-shot pass finished"
        );
        if !changed {
            let trees = driver
                .roots
                .iter()
                .map(|(id, root)| (id.to_string(), root.tree()))
                .collect();
            return Ok(OneShotOutput {
                markup,
                handoff: resolved,
                trees,
                passes: pass,
            });
        }
        served = resolved;
    }
    Err(Error::NoConvergence {
        passes: options.max_passes,
    })
}

type Resolution = Result<Value, Error>;

struct OneShotRoot<T> {
    map: TreeMap<T>,
    data: Option<T>,
    barrier: Barrier<T, Resolution>,
    requests: Vec<(String, Deferred<Resolution>)>,
}

impl<T: Clone> OneShotRoot<T> {
    fn tree(&self) -> RootTree<T> {
        RootTree {
            data: self.data.clone(),
            children: self.map.snapshot().tree(),
        }
    }
}

/// State of one one-shot pass.
struct OneShotDriver<T> {
    microtasks: Microtasks,
    roots: BTreeMap<Rc<str>, OneShotRoot<T>>,
    reads: HashMap<(Rc<str>, String), usize>,
    /// Values resolved by the previous pass, served to this pass's reads.
    served: Handoff,
}

impl<T: Clone + 'static> OneShotDriver<T> {
    fn new(served: Handoff) -> Self {
        Self {
            microtasks: Microtasks::new(),
            roots: BTreeMap::new(),
            reads: HashMap::new(),
            served,
        }
    }

    /// Resolve every root's barrier against its complete registry.
    fn resolve(&mut self) -> Result<Handoff, Error> {
        self.microtasks.run_until_idle();
        let mut resolved = Handoff::new();
        for (id, root) in &mut self.roots {
            let snapshot = root.map.snapshot();
            root.barrier.resolve(&snapshot);
            for (key, deferred) in root.requests.drain(..) {
                if let Some(value) = deferred.try_take() {
                    resolved.insert(&**id, key, value?);
                }
            }
        }
        Ok(resolved)
    }

    fn root(&mut self, root: &Rc<str>) -> &mut OneShotRoot<T> {
        let microtasks = &self.microtasks;
        self.roots
            .entry(root.clone())
            .or_insert_with(|| OneShotRoot {
                map: TreeMap::new(microtasks.clone()),
                data: None,
                barrier: Barrier::new(),
                requests: Vec::new(),
            })
    }
}

impl<T: Clone + 'static> Driver<T> for OneShotDriver<T> {
    fn open_root(&mut self, root: &Rc<str>, data: Option<T>) {
        self.root(root).data = data;
    }

    fn tree_map(&self, root: &str) -> Option<TreeMap<T>> {
        self.roots.get(root).map(|root| root.map.clone())
    }

    fn register(&mut self, root: &Rc<str>, key: String, path: IndexPath, payload: T) {
        self.root(root).map.set(key, path, payload);
    }

    fn next_read(&mut self, root: &Rc<str>, path: &str) -> usize {
        let count = self
            .reads
            .entry((root.clone(), path.to_string()))
            .or_insert(0);
        *count += 1;
        *count - 1
    }

    fn computed(
        &mut self,
        root: &Rc<str>,
        key: String,
        reducer: ReducerFn<T>,
    ) -> Result<Option<Value>, Error> {
        let served = self.served.get(root, &key).cloned();
        let slot = self.root(root);
        let compute = Box::new(move |snapshot: &Snapshot<T>| reducer(snapshot));
        let deferred = slot.barrier.request(key.clone(), compute);
        slot.requests.push((key, deferred));
        Ok(served)
    }
}

/// Render the application element with a fresh top-level scope.
pub(crate) fn render_root<T: Clone + 'static>(
    driver: &mut dyn Driver<T>,
    options: &RenderOptions,
    app: &Element<T>,
) -> Result<String, Error> {
    let mut renderer = Renderer {
        driver,
        options,
        out: String::new(),
    };
    renderer.element(app, &Scope::app())?;
    Ok(renderer.out)
}

struct Renderer<'a, T> {
    driver: &'a mut dyn Driver<T>,
    options: &'a RenderOptions,
    out: String,
}

impl<T: Clone + 'static> Renderer<'_, T> {
    fn element(&mut self, element: &Element<T>, scope: &Scope) -> Result<(), Error> {
        match element {
            Element::Component(component) => {
                let output = {
                    let mut cx = Cx::new(&mut *self.driver, self.options, scope.clone());
                    component.render(&mut cx)?
                };
                self.element(&output, &scope.at_slot(scope.slot.child(0)))
            }
            Element::Host(host) => self.host(host, scope),
            Element::Text(text) => {
                escape_into(&mut self.out, text, false);
                Ok(())
            }
            Element::Empty => Ok(()),
            Element::Fragment(children) | Element::Keyed { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    self.element(child, &scope.at_slot(scope.slot.child(i)))?;
                }
                Ok(())
            }
            Element::Indexed(indexed) => self.indexed(indexed, scope),
        }
    }

    fn host(&mut self, host: &Host<T>, scope: &Scope) -> Result<(), Error> {
        self.out.push('<');
        self.out.push_str(host.tag());
        for (name, value) in host.attrs() {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_into(&mut self.out, value, true);
            self.out.push('"');
        }
        self.out.push('>');
        for (i, child) in host.child_elements().iter().enumerate() {
            self.element(child, &scope.at_slot(scope.slot.child(i)))?;
        }
        self.out.push_str("</");
        self.out.push_str(host.tag());
        self.out.push('>');
        Ok(())
    }

    fn indexed(&mut self, indexed: &Indexed<T>, scope: &Scope) -> Result<(), Error> {
        let placements = assign_positions(&indexed.base, &indexed.children, indexed.policy);
        let level = Scope {
            position: indexed.base.clone(),
            root: indexed.root.clone(),
            slot: scope.slot.clone(),
        };
        self.placements(&placements, &level)
    }

    fn placements(
        &mut self,
        placements: &[Placement<'_, Element<T>>],
        level: &Scope,
    ) -> Result<(), Error> {
        for (i, placement) in placements.iter().enumerate() {
            let slot = level.slot.child(i);
            match placement {
                Placement::Node { slot: child, position } => {
                    let scope = Scope {
                        position: position.clone(),
                        root: level.root.clone(),
                        slot,
                    };
                    self.element(child, &scope)?;
                }
                Placement::Passthrough { slot: child } => {
                    self.element(child, &level.at_slot(slot))?;
                }
                Placement::Wrapper {
                    position, children, ..
                } => {
                    let inner = Scope {
                        position: position.clone().unwrap_or_else(|| level.position.clone()),
                        root: level.root.clone(),
                        slot,
                    };
                    self.placements(children, &inner)?;
                }
            }
        }
        Ok(())
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
