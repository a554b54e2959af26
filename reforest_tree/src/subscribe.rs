// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subscriber bookkeeping and the [`Subscription`] handle.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::map::Snapshot;

pub(crate) type Callback<T> = Rc<dyn Fn(&Snapshot<T>)>;

/// Identifier of a subscriber within one registry.
pub(crate) type SubscriberId = u64;

struct Slot<T> {
    id: SubscriberId,
    callback: Callback<T>,
    /// Still owed the notification that follows subscription.
    needs_initial: bool,
}

/// Ordered list of live subscribers.
pub(crate) struct Subscribers<T> {
    slots: Vec<Slot<T>>,
    next_id: SubscriberId,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Subscribers<T> {
    pub(crate) fn insert(&mut self, callback: Callback<T>) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.push(Slot {
            id,
            callback,
            needs_initial: true,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.id != id);
        before != self.slots.len()
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Callbacks due in a flush: everyone after a mutation, otherwise only new subscribers.
    pub(crate) fn take_due(&mut self, mutated: bool) -> Vec<(SubscriberId, Callback<T>)> {
        self.slots
            .iter_mut()
            .filter(|slot| mutated || slot.needs_initial)
            .map(|slot| {
                slot.needs_initial = false;
                (slot.id, slot.callback.clone())
            })
            .collect()
    }
}

/// Handle to a registry subscription.
///
/// Dropping the handle unsubscribes. [`Subscription::unsubscribe`] may be called any number
/// of times; only the first call has an effect.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Wrap the action that cancels a subscription.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop future notifications.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// True until [`Subscription::unsubscribe`] has run.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
