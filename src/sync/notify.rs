// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::waitqueue::{Waiter, WaitQueue};
use crate::{AsyncComputation, BoxComputation, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

/// A single-slot wakeup signal: `notify_one` either wakes a parked waiter
/// or, if none is parked, buffers one permit for the next call to
/// `notified()` to consume immediately.
///
/// Grounded on the same `WaitQueue` every other primitive in this module
/// shares; this is the simplest consumer of it.
pub struct Notify {
    permit: AtomicBool,
    waiters: WaitQueue,
}

impl Notify {
    /// A `Notify` with no buffered permit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permit: AtomicBool::new(false),
            waiters: WaitQueue::new(),
        }
    }

    /// Wake one waiter, or buffer a permit if none is currently parked.
    /// Returns the number of waiters actually woken (`0` or `1`) — buffering
    /// a permit for a future caller doesn't count as waking anyone.
    ///
    /// Best-effort under concurrent `notified()` registration: a `notify_one`
    /// racing with a waiter that has failed its permit check but not yet
    /// registered may be observed as "no one waiting" and buffer a permit
    /// instead of waking — the next call to `notified()` still consumes it
    /// immediately, so no notification is lost, only possibly delayed by
    /// one poll.
    pub fn notify_one(&self) -> usize {
        if self.waiters.wake_one() {
            1
        } else {
            self.permit.store(true, Ordering::Release);
            0
        }
    }

    /// Wake every waiter currently parked, without buffering a permit for
    /// future callers. Returns the number of waiters woken.
    pub fn notify_all(&self) -> usize {
        self.waiters.wake_all()
    }

    /// A computation that resolves once this `Notify` is signalled (either
    /// immediately, if a permit is already buffered, or on the next call to
    /// [`notify_one`](Self::notify_one)).
    pub fn notified(self: &Arc<Self>) -> BoxComputation<()> {
        Box::new(Notified {
            notify: self.clone(),
            waiter: None,
            done: false,
        })
    }
}

impl Default for Notify {
    fn default() -> Self {
        Self::new()
    }
}

struct Notified {
    notify: Arc<Notify>,
    waiter: Option<Waiter>,
    done: bool,
}

impl AsyncComputation<()> for Notified {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        if self.notify.permit.swap(false, Ordering::AcqRel) {
            if let Some(w) = self.waiter.take() {
                self.notify.waiters.remove(&w);
            }
            self.done = true;
            return Poll::Ready(());
        }
        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.notify.waiters.push_back(cx.waker())),
        }
        // Close the register-then-check race: a notify_one that ran between
        // our failed swap above and the push just now would have seen an
        // empty queue and buffered a permit instead of waking us.
        if self.notify.permit.swap(false, Ordering::AcqRel) {
            if let Some(w) = self.waiter.take() {
                self.notify.waiters.remove(&w);
            }
            self.done = true;
            return Poll::Ready(());
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.notify.waiters.remove(&w);
        }
        self.done = true;
    }
}
