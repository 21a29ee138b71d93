// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A three-state atomic park/unpark handle, narrowed to the one case this
//! crate needs: parking the thread calling [`run_sync`](crate::run_sync)
//! and unparking it from a [`Waker`] that may fire from any other thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{RawWaker, RawWakerVTable, Waker};
use std::thread::Thread;

const STATE_EMPTY: usize = 0;
const STATE_PARKED: usize = 1;
const STATE_NOTIFIED: usize = 2;

struct Inner {
    state: AtomicUsize,
    thread: Thread,
}

/// A handle that can park the thread that created it, and be cloned into a
/// [`Waker`] that unparks it from any thread.
#[derive(Clone)]
pub(crate) struct Parker(Arc<Inner>);

impl Parker {
    /// Build a parker bound to the calling thread.
    pub(crate) fn for_current() -> Self {
        Self(Arc::new(Inner {
            state: AtomicUsize::new(STATE_EMPTY),
            thread: std::thread::current(),
        }))
    }

    /// Block the calling thread until [`unpark`](Self::unpark) (or a Waker
    /// derived from this parker) is called, consuming exactly one
    /// notification. Tolerates spurious wakeups from the OS.
    pub(crate) fn park(&self) {
        if self
            .0
            .state
            .compare_exchange(STATE_NOTIFIED, STATE_EMPTY, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return;
        }

        match self.0.state.compare_exchange(
            STATE_EMPTY,
            STATE_PARKED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(STATE_NOTIFIED) => {
                let old = self.0.state.swap(STATE_EMPTY, Ordering::SeqCst);
                debug_assert_eq!(old, STATE_NOTIFIED, "park state changed unexpectedly");
                return;
            }
            Err(actual) => unreachable!("inconsistent park state; actual = {actual}"),
        }

        loop {
            std::thread::park();

            if self
                .0
                .state
                .compare_exchange(STATE_NOTIFIED, STATE_EMPTY, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return;
            }

            tracing::trace!("spurious wakeup in run_sync park loop, going back to sleep");
        }
    }

    /// Deliver a notification, unparking the thread if it is currently
    /// parked. Safe to call from any thread, any number of times.
    pub(crate) fn unpark(&self) {
        let previous = self.0.state.swap(STATE_NOTIFIED, Ordering::SeqCst);
        if previous == STATE_PARKED {
            self.0.thread.unpark();
        }
    }

    /// Build a [`Waker`] that calls [`unpark`](Self::unpark) when woken.
    pub(crate) fn into_waker(self) -> Waker {
        fn clone(raw: *const ()) -> RawWaker {
            // Safety: `raw` always originates from `Arc::into_raw::<Inner>`.
            unsafe {
                Arc::increment_strong_count(raw.cast::<Inner>());
            }
            RawWaker::new(raw, &VTABLE)
        }
        fn wake(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Inner>`.
            let inner = unsafe { Arc::from_raw(raw.cast::<Inner>()) };
            Parker(inner).unpark();
        }
        fn wake_by_ref(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Inner>`,
            // and we give back the refcount we briefly claimed.
            let inner = unsafe { Arc::from_raw(raw.cast::<Inner>()) };
            Parker(inner.clone()).unpark();
            std::mem::forget(inner);
        }
        fn drop_waker(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Inner>`.
            unsafe {
                drop(Arc::from_raw(raw.cast::<Inner>()));
            }
        }

        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_waker);

        let raw = RawWaker::new(Arc::into_raw(self.0).cast::<()>(), &VTABLE);
        // Safety: the vtable functions above uphold the `RawWaker` contract.
        unsafe { Waker::from_raw(raw) }
    }
}

impl fmt::Debug for Parker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.0.state.load(Ordering::Acquire) {
            STATE_EMPTY => "empty",
            STATE_PARKED => "parked",
            STATE_NOTIFIED => "notified",
            _ => "unknown",
        };
        f.debug_struct("Parker").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpark_before_park_is_remembered() {
        let parker = Parker::for_current();
        parker.unpark();
        parker.park(); // must not block: notification was already delivered.
    }

    #[test]
    fn waker_unparks_another_thread() {
        let parker = Parker::for_current();
        let waker = parker.clone().into_waker();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            waker.wake();
        });
        parker.park();
        handle.join().unwrap();
    }
}
