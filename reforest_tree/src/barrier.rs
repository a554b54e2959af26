// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot resolution of computations that need the complete registry.
//!
//! During a single pass nodes register one by one, so none of them can know when the
//! registry is complete. A node that needs an aggregate value files a request with the
//! root's [`Barrier`] and receives a [`Deferred`]. Once the pass has finished registering,
//! the driver calls [`Barrier::resolve`] with the final snapshot and every outstanding
//! request is computed against that same snapshot.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::map::Snapshot;

/// Computation run against the final snapshot.
pub type Compute<T, V> = Box<dyn FnOnce(&Snapshot<T>) -> V>;

enum SlotState<V> {
    Waiting(Option<Waker>),
    Ready(V),
    Taken,
}

struct Request<T, V> {
    key: String,
    compute: Compute<T, V>,
    slot: Weak<RefCell<SlotState<V>>>,
}

/// Shared resolution point for one aggregation root.
pub struct Barrier<T, V> {
    requests: Rc<RefCell<Vec<Request<T, V>>>>,
    resolutions: Rc<Cell<u64>>,
}

impl<T, V> Clone for Barrier<T, V> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            resolutions: self.resolutions.clone(),
        }
    }
}

impl<T, V> Default for Barrier<T, V> {
    fn default() -> Self {
        Self {
            requests: Rc::new(RefCell::new(Vec::new())),
            resolutions: Rc::new(Cell::new(0)),
        }
    }
}

impl<T, V> fmt::Debug for Barrier<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Barrier")
            .field("pending", &self.pending())
            .field("resolutions", &self.resolutions.get())
            .finish()
    }
}

impl<T, V> Barrier<T, V> {
    /// An empty barrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// File a request for `key`, to be computed at the next [`Barrier::resolve`].
    pub fn request(&self, key: impl Into<String>, compute: Compute<T, V>) -> Deferred<V> {
        let slot = Rc::new(RefCell::new(SlotState::Waiting(None)));
        let key = key.into();
        tracing::trace!(key = %key, "deferred request filed");
        self.requests.borrow_mut().push(Request {
            key,
            compute,
            slot: Rc::downgrade(&slot),
        });
        Deferred { slot }
    }

    /// Number of requests waiting for resolution, including cancelled ones not yet swept.
    pub fn pending(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Keys of the waiting requests, in filing order.
    pub fn pending_keys(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| request.key.clone())
            .collect()
    }

    /// How many times [`Barrier::resolve`] has run.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.get()
    }

    /// Compute every outstanding request against `snapshot`.
    ///
    /// Requests whose [`Deferred`] was dropped are discarded without running. Returns the
    /// number of requests that were fulfilled. Requests filed while resolving wait for the
    /// next call.
    pub fn resolve(&self, snapshot: &Snapshot<T>) -> usize {
        let requests = core::mem::take(&mut *self.requests.borrow_mut());
        self.resolutions.set(self.resolutions.get() + 1);
        let mut fulfilled = 0;
        for request in requests {
            let Some(slot) = request.slot.upgrade() else {
                tracing::trace!(key = %request.key, "deferred request cancelled");
                continue;
            };
            let value = (request.compute)(snapshot);
            let previous = core::mem::replace(&mut *slot.borrow_mut(), SlotState::Ready(value));
            if let SlotState::Waiting(Some(waker)) = previous {
                waker.wake();
            }
            fulfilled += 1;
        }
        tracing::debug!(fulfilled, entries = snapshot.len(), "barrier resolved");
        fulfilled
    }
}

/// The pending result of a [`Barrier`] request.
///
/// Await it or poll it with [`Deferred::try_take`]. Dropping it cancels the request.
#[must_use = "dropping a Deferred cancels its request"]
pub struct Deferred<V> {
    slot: Rc<RefCell<SlotState<V>>>,
}

impl<V> fmt::Debug for Deferred<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            SlotState::Waiting(_) => "waiting",
            SlotState::Ready(_) => "ready",
            SlotState::Taken => "taken",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<V> Deferred<V> {
    /// True once the barrier has produced a value that was not yet taken.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.slot.borrow(), SlotState::Ready(_))
    }

    /// Take the value if the barrier has resolved.
    pub fn try_take(&self) -> Option<V> {
        let mut slot = self.slot.borrow_mut();
        match core::mem::replace(&mut *slot, SlotState::Taken) {
            SlotState::Ready(value) => Some(value),
            other => {
                *slot = other;
                None
            }
        }
    }
}

impl<V> Future for Deferred<V> {
    type Output = V;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<V> {
        let mut slot = self.slot.borrow_mut();
        match core::mem::replace(&mut *slot, SlotState::Taken) {
            SlotState::Ready(value) => Poll::Ready(value),
            SlotState::Waiting(_) => {
                *slot = SlotState::Waiting(Some(cx.waker().clone()));
                Poll::Pending
            }
            // Polled after completion; stays pending.
            SlotState::Taken => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::NodeEntry;
    use alloc::vec;
    use reforest_index::IndexPath;

    fn snapshot(keys: &[&str]) -> Snapshot<u32> {
        Snapshot::from_entries(
            keys.iter()
                .enumerate()
                .map(|(i, key)| NodeEntry::new(*key, IndexPath::from_slice(&[i]), i as u32))
                .collect(),
        )
    }

    #[test]
    fn every_request_sees_the_final_snapshot() {
        let barrier: Barrier<u32, usize> = Barrier::new();
        let a = barrier.request("a", Box::new(|s: &Snapshot<u32>| s.len()));
        let b = barrier.request(
            "b",
            Box::new(|s: &Snapshot<u32>| s.position_of("b").unwrap()),
        );
        assert_eq!(a.try_take(), None);
        assert_eq!(barrier.pending_keys(), vec!["a", "b"]);

        assert_eq!(barrier.resolve(&snapshot(&["a", "b", "c"])), 2);
        assert_eq!(a.try_take(), Some(3));
        assert_eq!(b.try_take(), Some(1));
        assert_eq!(a.try_take(), None, "value is taken once");
        assert_eq!(barrier.pending(), 0);
    }

    #[test]
    fn dropped_request_never_runs() {
        let barrier: Barrier<u32, ()> = Barrier::new();
        let ran = Rc::new(RefCell::new(false));
        let flag = ran.clone();
        let deferred = barrier.request("gone", Box::new(move |_: &Snapshot<u32>| {
            *flag.borrow_mut() = true;
        }));
        drop(deferred);
        assert_eq!(barrier.resolve(&snapshot(&[])), 0);
        assert!(!*ran.borrow());
    }

    #[test]
    fn future_completes_after_resolve() {
        let barrier: Barrier<u32, usize> = Barrier::new();
        let mut deferred = barrier.request("a", Box::new(|s: &Snapshot<u32>| s.len()));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(Pin::new(&mut deferred).poll(&mut cx).is_pending());
        barrier.resolve(&snapshot(&["a", "b"]));
        assert!(deferred.is_ready());
        assert_eq!(Pin::new(&mut deferred).poll(&mut cx), Poll::Ready(2));
    }

    #[test]
    fn late_requests_wait_for_next_wave() {
        let barrier: Barrier<u32, usize> = Barrier::new();
        barrier.resolve(&snapshot(&["a"]));
        let late = barrier.request("late", Box::new(|s: &Snapshot<u32>| s.len()));
        assert!(!late.is_ready());
        barrier.resolve(&snapshot(&["a", "late"]));
        assert_eq!(late.try_take(), Some(2));
        assert_eq!(barrier.resolutions(), 2);
    }
}
