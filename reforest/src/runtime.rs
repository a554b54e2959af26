// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The incremental runtime: a long-lived tree that re-renders as its data changes.
//!
//! ## Passes
//!
//! A render pass evaluates every component. Registrations are staged rather than applied;
//! when the pass completes they are committed in one batch: new or changed payloads are
//! `set`, nodes that did not render are `delete`d, and boundaries that disappeared are
//! cleared. Committing queues one flush per registry, delivered when the runtime drains
//! its [`Microtasks`].
//!
//! Computed reads never block. A read that has no value yet returns `None`, and the paint
//! proceeds. After the flush, every reducer whose root changed is run again over the new
//! snapshot; if any output differs (compared as JSON values) the tree renders again. The
//! runtime settles once a pass leaves every computed value unchanged, bounded by
//! [`RenderOptions::max_passes`].
//!
//! ## Hydration
//!
//! [`Runtime::preload`] primes the computed cache with a [`Handoff`] from a one-shot
//! render. Reads whose root id and key match are served from it in the first pass, and
//! their reducers are not re-run for the initial registration of that root.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use reforest_index::IndexPath;
use reforest_tree::{Microtasks, Snapshot, Subscription, TreeMap};
use serde_json::Value;

use crate::cx::{Driver, ReducerFn};
use crate::element::Element;
use crate::error::Error;
use crate::handoff::Handoff;
use crate::options::RenderOptions;
use crate::render::render_root;
use crate::root::RootTree;

/// Counters describing the work a [`Runtime`] has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Render passes.
    pub passes: usize,
    /// Reducer evaluations.
    pub reducer_runs: usize,
    /// Computed reads served from a preloaded handoff.
    pub hydrated_hits: usize,
    /// Microtasks drained, including registry flushes.
    pub microtasks: usize,
}

type CacheKey = (Rc<str>, String);

type TreeCallback<T> = Rc<dyn Fn(&str, &RootTree<T>)>;

type RootData<T> = Rc<RefCell<Option<T>>>;

fn root_tree<T: Clone>(snapshot: &Snapshot<T>, data: &RootData<T>) -> RootTree<T> {
    RootTree {
        data: data.borrow().clone(),
        children: snapshot.tree(),
    }
}

struct CacheEntry<T> {
    value: Option<Value>,
    reducer: ReducerFn<T>,
    stale: bool,
}

struct LiveRoot<T> {
    map: TreeMap<T>,
    data: RootData<T>,
    committed: HashMap<String, (IndexPath, T)>,
    seen_generation: u64,
    /// Preloaded values stand for the first registration of this root.
    hydrating: bool,
    _watch: Subscription,
}

/// Tree subscribers shared by every root.
struct Watchers<T> {
    list: Rc<RefCell<Vec<(u64, TreeCallback<T>)>>>,
    next_id: Rc<Cell<u64>>,
}

impl<T> Clone for Watchers<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<T> Default for Watchers<T> {
    fn default() -> Self {
        Self {
            list: Rc::default(),
            next_id: Rc::default(),
        }
    }
}

impl<T: 'static> Watchers<T> {
    fn notify(&self, root: &str, tree: &RootTree<T>) {
        let callbacks: Vec<TreeCallback<T>> =
            self.list.borrow().iter().map(|(_, f)| f.clone()).collect();
        for callback in callbacks {
            callback(root, tree);
        }
    }

    fn insert(&self, callback: TreeCallback<T>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.list.borrow_mut().push((id, callback));
        let list = Rc::downgrade(&self.list);
        Subscription::new(move || {
            if let Some(list) = list.upgrade() {
                list.borrow_mut().retain(|(other, _)| *other != id);
            }
        })
    }

    fn is_live(&self, id: u64) -> bool {
        self.list.borrow().iter().any(|(other, _)| *other == id)
    }
}

struct State<T> {
    microtasks: Microtasks,
    roots: BTreeMap<Rc<str>, LiveRoot<T>>,
    cache: HashMap<CacheKey, CacheEntry<T>>,
    hydrated: Handoff,
    watchers: Watchers<T>,
    stats: RenderStats,
}

/// What one render pass touched.
struct Pass<T> {
    live_roots: BTreeSet<Rc<str>>,
    staged: HashMap<Rc<str>, HashMap<String, (IndexPath, T)>>,
    reads: HashSet<CacheKey>,
    read_counts: HashMap<CacheKey, usize>,
}

impl<T> Default for Pass<T> {
    fn default() -> Self {
        Self {
            live_roots: BTreeSet::new(),
            staged: HashMap::new(),
            reads: HashSet::new(),
            read_counts: HashMap::new(),
        }
    }
}

struct LiveDriver<'a, T> {
    state: &'a mut State<T>,
    pass: &'a mut Pass<T>,
}

impl<T: Clone + PartialEq + 'static> Driver<T> for LiveDriver<'_, T> {
    fn open_root(&mut self, root: &Rc<str>, data: Option<T>) {
        self.pass.live_roots.insert(root.clone());
        if let Some(live) = self.state.roots.get(root) {
            if *live.data.borrow() != data {
                tracing::trace!(root = %root, "root data changed");
                *live.data.borrow_mut() = data;
                let watchers = self.state.watchers.clone();
                let (id, map, data) = (root.clone(), live.map.clone(), live.data.clone());
                self.state.microtasks.queue(move || {
                    watchers.notify(&id, &root_tree(&map.snapshot(), &data));
                });
            }
            return;
        }
        let map = TreeMap::new(self.state.microtasks.clone());
        let data: RootData<T> = Rc::new(RefCell::new(data));
        let watchers = self.state.watchers.clone();
        let (id, shared) = (root.clone(), data.clone());
        let watch = map.subscribe(move |snapshot: &Snapshot<T>| {
            watchers.notify(&id, &root_tree(snapshot, &shared));
        });
        let hydrating = self.state.hydrated.has_root(root);
        tracing::debug!(root = %root, hydrating, "root mounted");
        self.state.roots.insert(
            root.clone(),
            LiveRoot {
                map,
                data,
                committed: HashMap::new(),
                seen_generation: 0,
                hydrating,
                _watch: watch,
            },
        );
    }

    fn tree_map(&self, root: &str) -> Option<TreeMap<T>> {
        self.state.roots.get(root).map(|root| root.map.clone())
    }

    fn register(&mut self, root: &Rc<str>, key: String, path: IndexPath, payload: T) {
        self.pass
            .staged
            .entry(root.clone())
            .or_default()
            .insert(key, (path, payload));
    }

    fn next_read(&mut self, root: &Rc<str>, path: &str) -> usize {
        let count = self
            .pass
            .read_counts
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
        let cache_key = (root.clone(), key);
        self.pass.reads.insert(cache_key.clone());
        if let Some(entry) = self.state.cache.get_mut(&cache_key) {
            // Props may have changed; keep the closure from the latest render.
            entry.reducer = reducer;
            return Ok(entry.value.clone());
        }
        let preloaded = self.state.hydrated.remove(root, &cache_key.1);
        if preloaded.is_some() {
            self.state.stats.hydrated_hits += 1;
        }
        let stale = preloaded.is_none();
        self.state.cache.insert(
            cache_key,
            CacheEntry {
                value: preloaded.clone(),
                reducer,
                stale,
            },
        );
        Ok(preloaded)
    }
}

impl<T: Clone + PartialEq + 'static> State<T> {
    /// Apply a pass's registrations and drop what it no longer rendered.
    fn commit(&mut self, mut pass: Pass<T>) {
        let vanished: Vec<Rc<str>> = self
            .roots
            .keys()
            .filter(|root| !pass.live_roots.contains(*root))
            .cloned()
            .collect();
        for root in vanished {
            if let Some(live) = self.roots.remove(&root) {
                tracing::debug!(root = %root, entries = live.map.len(), "root unmounted");
                live.map.clear();
            }
        }

        for root in &pass.live_roots {
            let Some(live) = self.roots.get_mut(root) else {
                continue;
            };
            let staged = pass.staged.remove(root).unwrap_or_default();
            for (key, (path, payload)) in &staged {
                let unchanged = live
                    .committed
                    .get(key)
                    .is_some_and(|(p, v)| p == path && v == payload);
                if !unchanged {
                    live.map.set(key.clone(), path.clone(), payload.clone());
                }
            }
            for key in live.committed.keys() {
                if !staged.contains_key(key) {
                    live.map.delete(key);
                }
            }
            live.committed = staged;
        }

        self.cache.retain(|key, _| pass.reads.contains(key));
    }

    /// Run every stale reducer; true if any value changed.
    fn recompute(&mut self) -> Result<bool, Error> {
        let mut changed = false;
        for (root_id, root) in &mut self.roots {
            let generation = root.map.generation();
            let mutated = generation != root.seen_generation;
            root.seen_generation = generation;
            let hydrating = std::mem::replace(&mut root.hydrating, false);

            let mut snapshot = None;
            for ((entry_root, key), entry) in &mut self.cache {
                if entry_root != root_id {
                    continue;
                }
                if mutated && !hydrating {
                    entry.stale = true;
                }
                if !entry.stale {
                    continue;
                }
                let snapshot = snapshot.get_or_insert_with(|| root.map.snapshot());
                let value = (entry.reducer)(snapshot)?;
                self.stats.reducer_runs += 1;
                entry.stale = false;
                if entry.value.as_ref() != Some(&value) {
                    tracing::trace!(root = %root_id, key = %key, "computed value changed");
                    entry.value = Some(value);
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    fn drain(&mut self) {
        self.stats.microtasks += self.microtasks.run_until_idle();
    }
}

/// A long-lived, incrementally updated tree.
///
/// ```
/// use reforest::{Component, Element, Host, RenderOptions, Runtime};
///
/// fn item(name: &'static str) -> Element<&'static str> {
///     Component::new("Item", move |cx| {
///         let (_, count) = cx.register_with(name, |snapshot, _| snapshot.len())?;
///         let text = count.map_or(name.to_string(), |n: usize| format!("{name}/{n}"));
///         Ok(Host::new("li").child(text).into())
///     })
///     .into()
/// }
///
/// fn list(names: &'static [&'static str]) -> Element<&'static str> {
///     Component::new("List", move |cx| {
///         let tree = cx.tree(names.iter().copied().map(item))?;
///         Ok(Host::new("ul").child(tree.children()).into())
///     })
///     .into()
/// }
///
/// let mut runtime = Runtime::new(list(&["a", "b"]), RenderOptions::default());
/// runtime.mount().unwrap();
/// assert_eq!(runtime.markup(), "<ul><li>a/2</li><li>b/2</li></ul>");
///
/// runtime.update(list(&["a", "b", "c"])).unwrap();
/// assert_eq!(runtime.markup(), "<ul><li>a/3</li><li>b/3</li><li>c/3</li></ul>");
/// ```
pub struct Runtime<T> {
    app: Element<T>,
    options: RenderOptions,
    state: State<T>,
    markup: String,
    mounted: bool,
}

impl<T> fmt::Debug for Runtime<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mounted", &self.mounted)
            .field("roots", &self.state.roots.keys().collect::<Vec<_>>())
            .field("cached", &self.state.cache.len())
            .field("stats", &self.state.stats)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> Runtime<T> {
    /// A runtime for `app`. Nothing renders until [`Runtime::mount`].
    pub fn new(app: Element<T>, options: RenderOptions) -> Self {
        Self {
            app,
            options,
            state: State {
                microtasks: Microtasks::new(),
                roots: BTreeMap::new(),
                cache: HashMap::new(),
                hydrated: Handoff::new(),
                watchers: Watchers::default(),
                stats: RenderStats::default(),
            },
            markup: String::new(),
            mounted: false,
        }
    }

    /// Prime the computed cache with values from a one-shot render.
    ///
    /// Values whose keys no node reads are ignored.
    pub fn preload(&mut self, handoff: Handoff) {
        tracing::debug!(values = handoff.len(), "handoff preloaded");
        self.state.hydrated = handoff;
    }

    /// Preload from the handoff script embedded in `document`; false if none was found.
    pub fn hydrate(&mut self, document: &str) -> bool {
        match Handoff::extract(document) {
            Some(handoff) => {
                self.preload(handoff);
                true
            }
            None => {
                tracing::warn!("no handoff found, computed values will be recomputed");
                false
            }
        }
    }

    /// Render for the first time and settle.
    pub fn mount(&mut self) -> Result<(), Error> {
        self.mounted = true;
        self.run()?;
        if !self.state.hydrated.is_empty() {
            tracing::warn!(
                unused = self.state.hydrated.len(),
                "handoff values had no matching reader"
            );
            self.state.hydrated = Handoff::new();
        }
        Ok(())
    }

    /// Replace the application element and settle.
    pub fn update(&mut self, app: Element<T>) -> Result<(), Error> {
        self.app = app;
        for entry in self.state.cache.values_mut() {
            entry.stale = true;
        }
        if !self.mounted {
            return Ok(());
        }
        self.run()
    }

    /// Deliver pending notifications, then re-render if any computed value changed.
    ///
    /// Needed after mutating a registry through [`Runtime::tree_map`] or a
    /// [`Cx::tree_map`](crate::Cx::tree_map) handle.
    pub fn settle(&mut self) -> Result<(), Error> {
        self.state.drain();
        if self.mounted && self.state.recompute()? {
            self.run()?;
        }
        Ok(())
    }

    /// Remove every registration and forget computed values.
    pub fn unmount(&mut self) {
        for (_, root) in std::mem::take(&mut self.state.roots) {
            root.map.clear();
        }
        self.state.cache.clear();
        self.state.drain();
        self.markup.clear();
        self.mounted = false;
        tracing::debug!("runtime unmounted");
    }

    fn run(&mut self) -> Result<(), Error> {
        for _ in 0..self.options.max_passes {
            self.render_pass()?;
            if !self.state.recompute()? {
                return Ok(());
            }
        }
        Err(Error::NoConvergence {
            passes: self.options.max_passes,
        })
    }

    fn render_pass(&mut self) -> Result<(), Error> {
        self.state.stats.passes += 1;
        let mut pass = Pass::default();
        let markup = {
            let mut driver = LiveDriver {
                state: &mut self.state,
                pass: &mut pass,
            };
            render_root(&mut driver, &self.options, &self.app)?
        };
        tracing::debug!(
            pass = self.state.stats.passes,
            roots = pass.live_roots.len(),
            reads = pass.reads.len(),
            "incremental pass rendered"
        );
        self.markup = markup;
        self.state.commit(pass);
        self.state.drain();
        Ok(())
    }
}

impl<T: Clone + 'static> Runtime<T> {
    /// Markup of the latest pass.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// True between [`Runtime::mount`] and [`Runtime::unmount`].
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Ids of the mounted roots, in order.
    pub fn roots(&self) -> Vec<&str> {
        self.state.roots.keys().map(|root| &**root).collect()
    }

    /// Registry of a mounted root.
    pub fn tree_map(&self, root: &str) -> Option<TreeMap<T>> {
        self.state.roots.get(root).map(|root| root.map.clone())
    }

    /// Built tree of a mounted root, with the root's own data.
    pub fn tree(&self, root: &str) -> Option<RootTree<T>> {
        self.state
            .roots
            .get(root)
            .map(|root| root_tree(&root.map.snapshot(), &root.data))
    }

    /// Cached value of the computed read `key` under `root`.
    pub fn computed_value(&self, root: &str, key: &str) -> Option<&Value> {
        self.state
            .cache
            .get(&(Rc::<str>::from(root), key.to_string()))?
            .value
            .as_ref()
    }

    /// Current computed values in handoff form.
    pub fn handoff(&self) -> Handoff {
        let mut handoff = Handoff::new();
        for ((root, key), entry) in &self.state.cache {
            if let Some(value) = &entry.value {
                handoff.insert(&**root, key.clone(), value.clone());
            }
        }
        handoff
    }

    /// Observe the built tree of every root, merged with the root's own data.
    ///
    /// Runs once per existing root at the next drain, then after every batch that mutates
    /// a root or changes its data, including roots mounted later.
    pub fn subscribe_trees(
        &self,
        on_update: impl Fn(&str, &RootTree<T>) + 'static,
    ) -> Subscription {
        let callback: TreeCallback<T> = Rc::new(on_update);
        let watcher = self.state.watchers.next_id.get();
        let subscription = self.state.watchers.insert(callback.clone());
        let watchers = self.state.watchers.clone();
        let roots: Vec<(Rc<str>, TreeMap<T>, RootData<T>)> = self
            .state
            .roots
            .iter()
            .map(|(id, root)| (id.clone(), root.map.clone(), root.data.clone()))
            .collect();
        self.state.microtasks.queue(move || {
            if !watchers.is_live(watcher) {
                return;
            }
            for (root, map, data) in roots {
                callback(&*root, &root_tree(&map.snapshot(), &data));
            }
        });
        subscription
    }

    /// Work counters.
    pub fn stats(&self) -> RenderStats {
        self.state.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Component, Host};

    fn counted(name: &'static str) -> Element<&'static str> {
        Component::new("Counted", move |cx| {
            let (key, count) = cx.register_with(name, |snapshot, _| snapshot.len())?;
            let text = match count {
                Some(n) => format!("{}:{n}", key.key()),
                None => format!("{}:?", key.key()),
            };
            Ok(Element::text(text))
        })
        .into()
    }

    fn app(names: Vec<&'static str>) -> Element<&'static str> {
        Component::new("App", move |cx| {
            let tree = cx.tree(names.iter().copied().map(counted))?;
            Ok(Host::new("div").child(tree.children()).into())
        })
        .into()
    }

    #[test]
    fn first_paint_then_settle() {
        let mut runtime = Runtime::new(app(vec!["a", "b"]), RenderOptions::default());
        runtime.mount().unwrap();
        assert_eq!(runtime.markup(), "<div>0:21:2</div>");
        let stats = runtime.stats();
        assert_eq!(stats.passes, 2, "one paint without values, one with");
        assert_eq!(stats.reducer_runs, 2);
        assert_eq!(runtime.roots(), vec!["tree-0"]);
    }

    #[test]
    fn unchanged_payloads_are_not_rewritten() {
        let mut runtime = Runtime::new(app(vec!["a", "b"]), RenderOptions::default());
        runtime.mount().unwrap();
        let map = runtime.tree_map("tree-0").unwrap();
        let generation = map.generation();
        runtime.update(app(vec!["a", "b"])).unwrap();
        assert_eq!(map.generation(), generation, "identical pass commits nothing");
    }

    #[test]
    fn removed_nodes_are_deleted() {
        let mut runtime = Runtime::new(app(vec!["a", "b", "c"]), RenderOptions::default());
        runtime.mount().unwrap();
        runtime.update(app(vec!["a"])).unwrap();
        assert_eq!(runtime.markup(), "<div>0:1</div>");
        let map = runtime.tree_map("tree-0").unwrap();
        assert_eq!(map.len(), 1);
        assert!(runtime.computed_value("tree-0", "2").is_none());
    }

    #[test]
    fn tree_subscribers_see_batches() {
        let mut runtime = Runtime::new(app(vec!["a", "b"]), RenderOptions::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut sub = runtime.subscribe_trees(move |root, tree| {
            let names: Vec<&str> = tree.children.iter().map(|node| node.data).collect();
            sink.borrow_mut().push(format!("{root}={}", names.join(",")));
        });
        runtime.mount().unwrap();
        assert_eq!(*seen.borrow(), vec!["tree-0=a,b".to_string()]);

        runtime.update(app(vec!["a", "b", "c"])).unwrap();
        assert_eq!(seen.borrow().last().map(String::as_str), Some("tree-0=a,b,c"));

        sub.unsubscribe();
        let before = seen.borrow().len();
        runtime.update(app(vec!["c"])).unwrap();
        assert_eq!(seen.borrow().len(), before);
    }

    #[test]
    fn unmount_clears_everything() {
        let mut runtime = Runtime::new(app(vec!["a"]), RenderOptions::default());
        runtime.mount().unwrap();
        let map = runtime.tree_map("tree-0").unwrap();
        runtime.unmount();
        assert!(map.is_empty());
        assert!(runtime.roots().is_empty());
        assert!(runtime.handoff().is_empty());
        assert!(!runtime.is_mounted());
    }

    #[test]
    fn external_mutation_settles() {
        let mut runtime = Runtime::new(app(vec!["a", "b"]), RenderOptions::default());
        runtime.mount().unwrap();
        let map = runtime.tree_map("tree-0").unwrap();
        map.set("9", IndexPath::from_slice(&[9]), "z");
        runtime.settle().unwrap();
        assert_eq!(runtime.markup(), "<div>0:31:3</div>");
    }
}
