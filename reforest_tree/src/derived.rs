// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reducer outputs that only notify when their value changes.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::map::{Snapshot, TreeMap};
use crate::subscribe::Subscription;

struct State<C> {
    current: RefCell<Option<C>>,
    runs: Cell<u64>,
    changes: Cell<u64>,
}

/// A value computed from every registry snapshot.
///
/// The reducer runs once per flushed batch. `on_change` runs only when the new output is
/// not equal to the previous one, so a mutation that leaves the reduced value untouched is
/// invisible downstream. The first output always counts as a change.
///
/// Dropping the handle detaches the reducer.
pub struct Derived<C> {
    state: Rc<State<C>>,
    subscription: Subscription,
}

impl<C: fmt::Debug> fmt::Debug for Derived<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("current", &self.state.current.borrow())
            .field("runs", &self.state.runs.get())
            .field("changes", &self.state.changes.get())
            .finish()
    }
}

impl<C: Clone + PartialEq + 'static> Derived<C> {
    pub(crate) fn attach<T: Clone + 'static>(
        map: &TreeMap<T>,
        reducer: impl Fn(&Snapshot<T>) -> C + 'static,
        on_change: impl Fn(&C) + 'static,
    ) -> Self {
        let state = Rc::new(State {
            current: RefCell::new(None),
            runs: Cell::new(0),
            changes: Cell::new(0),
        });
        let inner = state.clone();
        let subscription = map.subscribe(move |snapshot| {
            let next = reducer(snapshot);
            inner.runs.set(inner.runs.get() + 1);
            if inner.current.borrow().as_ref() == Some(&next) {
                tracing::trace!(generation = snapshot.generation(), "derived value unchanged");
                return;
            }
            inner.changes.set(inner.changes.get() + 1);
            *inner.current.borrow_mut() = Some(next.clone());
            on_change(&next);
        });
        Self {
            state,
            subscription,
        }
    }

    /// Latest output, or `None` before the first flush.
    pub fn get(&self) -> Option<C> {
        self.state.current.borrow().clone()
    }
}

impl<C> Derived<C> {
    /// How many times the reducer ran.
    pub fn runs(&self) -> u64 {
        self.state.runs.get()
    }

    /// How many times `on_change` fired.
    pub fn changes(&self) -> u64 {
        self.state.changes.get()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn detach(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Microtasks;
    use alloc::vec;
    use alloc::vec::Vec;
    use reforest_index::IndexPath;

    #[test]
    fn equal_output_does_not_notify() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let count = map.derive(
            |snapshot: &Snapshot<&'static str>| snapshot.len(),
            move |len| sink.borrow_mut().push(*len),
        );

        map.set("a", IndexPath::from_slice(&[0]), "apple");
        tasks.run_until_idle();
        // Same length after replacing a payload.
        map.set("a", IndexPath::from_slice(&[0]), "apricot");
        tasks.run_until_idle();
        map.set("b", IndexPath::from_slice(&[1]), "banana");
        tasks.run_until_idle();

        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(count.runs(), 3);
        assert_eq!(count.changes(), 2);
        assert_eq!(count.get(), Some(2));
    }

    #[test]
    fn structural_equality_on_collections() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let fires = Rc::new(Cell::new(0));
        let sink = fires.clone();
        let keys = map.derive(
            |snapshot: &Snapshot<u8>| {
                snapshot
                    .keys()
                    .map(alloc::string::String::from)
                    .collect::<Vec<_>>()
            },
            move |_| sink.set(sink.get() + 1),
        );
        map.set("x", IndexPath::from_slice(&[0]), 1);
        tasks.run_until_idle();
        map.set("x", IndexPath::from_slice(&[0]), 2);
        tasks.run_until_idle();
        assert_eq!(fires.get(), 1);
        assert_eq!(keys.get(), Some(vec!["x".into()]));
    }

    #[test]
    fn detach_keeps_last_value() {
        let tasks = Microtasks::new();
        let map = TreeMap::new(tasks.clone());
        let mut total = map.derive(
            |snapshot: &Snapshot<u32>| snapshot.iter().map(|e| e.payload).sum::<u32>(),
            |_| {},
        );
        map.set("0", IndexPath::from_slice(&[0]), 5);
        tasks.run_until_idle();
        total.detach();
        map.set("1", IndexPath::from_slice(&[1]), 7);
        tasks.run_until_idle();
        assert_eq!(total.get(), Some(5));
        assert_eq!(total.runs(), 1);
    }
}
