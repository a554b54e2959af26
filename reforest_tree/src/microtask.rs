// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single-threaded "next tick" queue.
//!
//! Registry mutations never notify synchronously. They queue one flush here, and whoever
//! drives the render passes drains the queue once the synchronous work of a pass is done.
//! Everything queued while draining runs in the same [`Microtasks::run_until_idle`] call.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

type Task = Box<dyn FnOnce()>;

/// Shared handle to a FIFO queue of deferred tasks.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct Microtasks {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for Microtasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microtasks")
            .field("pending", &self.len())
            .finish()
    }
}

impl Microtasks {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer `task` until the next drain.
    pub fn queue(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run tasks until the queue is empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// True when nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// True if both handles share one queue.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;

    #[test]
    fn runs_in_fifo_order_including_requeued_tasks() {
        let tasks = Microtasks::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (l1, l2) = (log.clone(), log.clone());
        let inner = tasks.clone();
        tasks.queue(move || {
            l1.borrow_mut().push(1);
            let l3 = l1.clone();
            inner.queue(move || l3.borrow_mut().push(3));
        });
        tasks.queue(move || l2.borrow_mut().push(2));

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert!(tasks.is_idle());
    }

    #[test]
    fn draining_an_empty_queue_is_a_no_op() {
        let tasks = Microtasks::new();
        let hits = Rc::new(Cell::new(0));
        assert_eq!(tasks.run_until_idle(), 0);
        let h = hits.clone();
        tasks.queue(move || h.set(h.get() + 1));
        tasks.run_until_idle();
        tasks.run_until_idle();
        assert_eq!(hits.get(), 1);
    }
}
