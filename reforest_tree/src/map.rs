// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node registry: a shared, observable map from node key to payload.
//!
//! ## Batching
//!
//! [`TreeMap::set`], [`TreeMap::delete`], and [`TreeMap::clear`] apply immediately but do not
//! notify. The first mutation in a window queues a single flush on the registry's
//! [`Microtasks`]; when the queue drains, each subscriber receives one sorted [`Snapshot`]
//! holding the settled state of the whole window.
//!
//! ## Snapshots
//!
//! Reads hand out immutable copies sorted by [`IndexPath`] order. Consumers never see the
//! live map, so building a tree from a snapshot cannot observe a mutation half way through.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use reforest_index::IndexPath;

use crate::build::{TreeNode, build_tree};
use crate::derived::Derived;
use crate::microtask::Microtasks;
use crate::subscribe::{Subscribers, Subscription};

/// A registered node: its key, its index path, and the user payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEntry<T> {
    /// Registry key.
    pub key: String,
    /// Position of the node below its aggregation root.
    pub index_path: IndexPath,
    /// User-supplied data.
    pub payload: T,
}

impl<T> NodeEntry<T> {
    /// Create an entry.
    pub fn new(key: impl Into<String>, index_path: IndexPath, payload: T) -> Self {
        Self {
            key: key.into(),
            index_path,
            payload,
        }
    }

    /// Serialized index path.
    pub fn index_path_string(&self) -> String {
        use alloc::string::ToString;
        self.index_path.to_string()
    }
}

/// Immutable registry contents sorted by index path.
#[derive(Clone)]
pub struct Snapshot<T> {
    entries: Rc<[NodeEntry<T>]>,
    generation: u64,
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation)
            .field("entries", &&*self.entries)
            .finish()
    }
}

impl<T> Snapshot<T> {
    /// Sort `entries` into a snapshot.
    pub fn from_entries(mut entries: Vec<NodeEntry<T>>) -> Self {
        sort_entries(&mut entries);
        Self {
            entries: entries.into(),
            generation: 0,
        }
    }

    /// Entries in index path order.
    pub fn entries(&self) -> &[NodeEntry<T>] {
        &self.entries
    }

    /// Iterate entries in index path order.
    pub fn iter(&self) -> core::slice::Iter<'_, NodeEntry<T>> {
        self.entries.iter()
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&NodeEntry<T>> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Rank of `key` in index path order.
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    /// Keys in index path order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of flushed batches the registry had seen when this snapshot was taken.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T: Clone> Snapshot<T> {
    /// Nested tree built from this snapshot.
    pub fn tree(&self) -> Vec<TreeNode<T>> {
        build_tree(&self.entries)
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a NodeEntry<T>;
    type IntoIter = core::slice::Iter<'a, NodeEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub(crate) fn sort_entries<T>(entries: &mut [NodeEntry<T>]) {
    entries.sort_by(|a, b| {
        a.index_path
            .cmp(&b.index_path)
            .then_with(|| a.key.cmp(&b.key))
    });
}

struct Shared<T> {
    entries: RefCell<HashMap<String, NodeEntry<T>>>,
    subscribers: RefCell<Subscribers<T>>,
    microtasks: Microtasks,
    flush_queued: Cell<bool>,
    mutated: Cell<bool>,
    generation: Cell<u64>,
}

/// Shared handle to a node registry.
///
/// Clones refer to the same registry. All mutation goes through `set`/`delete`/`clear`.
pub struct TreeMap<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for TreeMap<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for TreeMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeMap")
            .field("len", &self.len())
            .field("subscribers", &self.shared.subscribers.borrow().len())
            .field("generation", &self.shared.generation.get())
            .field("flush_queued", &self.shared.flush_queued.get())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> TreeMap<T> {
    /// Create an empty registry that batches notifications on `microtasks`.
    pub fn new(microtasks: Microtasks) -> Self {
        Self {
            shared: Rc::new(Shared {
                entries: RefCell::new(HashMap::new()),
                subscribers: RefCell::new(Subscribers::default()),
                microtasks,
                flush_queued: Cell::new(false),
                mutated: Cell::new(false),
                generation: Cell::new(0),
            }),
        }
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Payload changes for a mounted node are `set` calls with the same key.
    pub fn set(&self, key: impl Into<String>, index_path: IndexPath, payload: T) {
        let entry = NodeEntry::new(key, index_path, payload);
        tracing::trace!(key = %entry.key, path = %entry.index_path, "registry set");
        self.shared
            .entries
            .borrow_mut()
            .insert(entry.key.clone(), entry);
        self.mark_mutated();
    }

    /// Remove the entry for `key`, returning its payload.
    ///
    /// Removing an absent key does nothing and queues no notification.
    pub fn delete(&self, key: &str) -> Option<T> {
        let removed = self.shared.entries.borrow_mut().remove(key)?;
        tracing::trace!(key, "registry delete");
        self.mark_mutated();
        Some(removed.payload)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let had_entries = {
            let mut entries = self.shared.entries.borrow_mut();
            let had_entries = !entries.is_empty();
            entries.clear();
            had_entries
        };
        if had_entries {
            self.mark_mutated();
        }
    }

    /// Subscribe to batched updates.
    ///
    /// `on_update` runs once at the end of the current window (even if nothing changes), and
    /// once after every later window that mutated the registry.
    pub fn subscribe(&self, on_update: impl Fn(&Snapshot<T>) + 'static) -> Subscription {
        let id = self
            .shared
            .subscribers
            .borrow_mut()
            .insert(Rc::new(on_update));
        self.queue_flush();
        let weak = Rc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.subscribers.borrow_mut().remove(id);
            }
        })
    }

    /// Subscribe to the nested tree instead of the flat snapshot.
    pub fn subscribe_tree(&self, on_update: impl Fn(&[TreeNode<T>]) + 'static) -> Subscription {
        self.subscribe(move |snapshot| on_update(&snapshot.tree()))
    }

    /// Derive a value from every snapshot, notifying only when it changes.
    ///
    /// See [`Derived`].
    pub fn derive<C>(
        &self,
        reducer: impl Fn(&Snapshot<T>) -> C + 'static,
        on_change: impl Fn(&C) + 'static,
    ) -> Derived<C>
    where
        C: Clone + PartialEq + 'static,
    {
        Derived::attach(self, reducer, on_change)
    }

    fn mark_mutated(&self) {
        self.shared.mutated.set(true);
        self.queue_flush();
    }

    fn queue_flush(&self) {
        if self.shared.flush_queued.replace(true) {
            return;
        }
        let weak: Weak<Shared<T>> = Rc::downgrade(&self.shared);
        self.shared.microtasks.queue(move || {
            if let Some(shared) = weak.upgrade() {
                Self { shared }.flush();
            }
        });
    }

    fn flush(&self) {
        let shared = &self.shared;
        shared.flush_queued.set(false);
        let mutated = shared.mutated.replace(false);
        if mutated {
            shared.generation.set(shared.generation.get() + 1);
        }
        let due = shared.subscribers.borrow_mut().take_due(mutated);
        if due.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        tracing::trace!(
            generation = snapshot.generation(),
            entries = snapshot.len(),
            subscribers = due.len(),
            "registry flush"
        );
        for (id, callback) in due {
            // A callback earlier in this flush may have unsubscribed a later one.
            if shared.subscribers.borrow().contains(id) {
                callback(&snapshot);
            }
        }
    }
}

impl<T: Clone> TreeMap<T> {
    /// Sorted, immutable copy of the current contents.
    pub fn snapshot(&self) -> Snapshot<T> {
        let mut entries: Vec<NodeEntry<T>> =
            self.shared.entries.borrow().values().cloned().collect();
        sort_entries(&mut entries);
        Snapshot {
            entries: entries.into(),
            generation: self.shared.generation.get(),
        }
    }

    /// Payload registered under `key`.
    pub fn get(&self, key: &str) -> Option<T> {
        self.shared
            .entries
            .borrow()
            .get(key)
            .map(|entry| entry.payload.clone())
    }
}

impl<T> TreeMap<T> {
    /// True if `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.shared.entries.borrow().contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.borrow().is_empty()
    }

    /// Number of flushed windows that mutated the registry.
    pub fn generation(&self) -> u64 {
        self.shared.generation.get()
    }

    /// True while a flush is queued and not yet run.
    pub fn has_pending_flush(&self) -> bool {
        self.shared.flush_queued.get()
    }

    /// The queue this registry flushes on.
    pub fn microtasks(&self) -> &Microtasks {
        &self.shared.microtasks
    }

    /// True if both handles refer to the same registry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use reforest_index::parse_index_path;

    fn path(s: &str) -> IndexPath {
        parse_index_path(s).unwrap()
    }

    fn keys(snapshot: &Snapshot<u32>) -> Vec<String> {
        snapshot.keys().map(ToString::to_string).collect()
    }

    #[test]
    fn snapshot_is_sorted_by_path_not_insertion() {
        let map = TreeMap::new(Microtasks::new());
        for (key, value) in [("2", 2), ("0", 0), ("10", 10), ("1", 1)] {
            map.set(key, path(key), value);
        }
        assert_eq!(keys(&map.snapshot()), vec!["0", "1", "2", "10"]);
    }

    #[test]
    fn hundred_sets_notify_once() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        let _sub = map.subscribe(move |snapshot: &Snapshot<u32>| {
            seen.borrow_mut().push(snapshot.len());
        });
        for i in 0..100_u32 {
            let key = i.to_string();
            map.set(key.clone(), path(&key), i);
        }
        assert!(calls.borrow().is_empty(), "no synchronous notification");
        tasks.run_until_idle();
        assert_eq!(*calls.borrow(), vec![100]);
        assert_eq!(map.generation(), 1);
    }

    #[test]
    fn initial_notification_without_mutation() {
        let tasks = Microtasks::new();
        let map: TreeMap<u32> = TreeMap::new(tasks.clone());
        map.set("0", path("0"), 7);
        tasks.run_until_idle();

        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let _sub = map.subscribe(move |snapshot| {
            assert_eq!(snapshot.len(), 1);
            seen.set(seen.get() + 1);
        });
        tasks.run_until_idle();
        assert_eq!(calls.get(), 1, "subscription delivers initial state");
        tasks.run_until_idle();
        assert_eq!(calls.get(), 1, "no mutation, no further calls");

        map.set("1", path("1"), 8);
        tasks.run_until_idle();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        map.set("0", path("0"), 1_u32);
        map.set("1", path("1"), 2_u32);
        tasks.run_until_idle();

        assert_eq!(map.delete("0"), Some(1));
        let after_once = map.snapshot();
        assert_eq!(map.delete("0"), None);
        assert_eq!(map.snapshot().entries(), after_once.entries());
        assert_eq!(map.delete("never-inserted"), None);
        tasks.run_until_idle();
        assert_eq!(map.generation(), 2);

        // A window with only no-op deletes does not count as a mutation.
        assert_eq!(map.delete("0"), None);
        assert!(!map.has_pending_flush());
    }

    #[test]
    fn unsubscribe_twice_and_drop() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut sub = map.subscribe(move |_: &Snapshot<u32>| seen.set(seen.get() + 1));
        tasks.run_until_idle();
        assert_eq!(calls.get(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        map.set("0", path("0"), 1);
        tasks.run_until_idle();
        assert_eq!(calls.get(), 1);

        let seen = calls.clone();
        let dropped = map.subscribe(move |_| seen.set(seen.get() + 10));
        drop(dropped);
        map.set("1", path("1"), 2);
        tasks.run_until_idle();
        assert_eq!(calls.get(), 1, "dropped subscription never fires");
    }

    #[test]
    fn subscriber_mutation_schedules_another_flush() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let (seen, writer) = (sizes.clone(), map.clone());
        let _sub = map.subscribe(move |snapshot: &Snapshot<u32>| {
            seen.borrow_mut().push(snapshot.len());
            if snapshot.len() == 1 {
                writer.set("1", parse_index_path("1").unwrap(), 1);
            }
        });
        map.set("0", path("0"), 0);
        tasks.run_until_idle();
        assert_eq!(*sizes.borrow(), vec![1, 2]);
    }

    #[test]
    fn snapshots_are_detached_from_live_state() {
        let map = TreeMap::new(Microtasks::new());
        map.set("0", path("0"), 1_u32);
        let before = map.snapshot();
        map.set("0", path("0"), 2);
        map.set("1", path("1"), 3);
        assert_eq!(before.len(), 1);
        assert_eq!(before.get("0").map(|e| e.payload), Some(1));
        assert_eq!(map.get("0"), Some(2));
        assert_eq!(map.snapshot().position_of("1"), Some(1));
    }

    #[test]
    fn independent_registries_do_not_leak() {
        let tasks = Microtasks::new();
        let a = TreeMap::new(tasks.clone());
        let b = TreeMap::new(tasks.clone());
        a.set("0", path("0"), 1_u32);
        tasks.run_until_idle();
        assert!(b.is_empty());
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }
}
