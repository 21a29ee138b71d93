// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::waitqueue::{Waiter, WaitQueue};
use crate::{AsyncComputation, BoxComputation, Context};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

/// An asynchronous mutual-exclusion lock, built over a single
/// `AtomicBool` and a [`WaitQueue`].
///
/// There is no poisoning: a panic while holding the guard simply unlocks on
/// drop like any other value, matching this crate's general policy of
/// treating host exceptions as ordinary unwinding rather than a distinct
/// error channel.
pub struct Mutex<T: ?Sized> {
    locked: AtomicBool,
    waiters: WaitQueue,
    data: UnsafeCell<T>,
}

// Safety: `data` is only ever accessed through a `MutexGuard`, and
// `locked` ensures at most one `MutexGuard` exists at a time.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
// Safety: same reasoning as the `Send` impl above.
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// An unlocked mutex wrapping `value`.
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            waiters: WaitQueue::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Non-blocking: acquires the lock if it's free, otherwise returns
    /// `None` immediately.
    pub fn try_lock(self: &Arc<Self>) -> Option<MutexGuard<T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|()| MutexGuard {
                mutex: self.clone(),
            })
    }

    /// A computation that resolves to a [`MutexGuard`] once the lock is
    /// acquired.
    pub fn lock(self: &Arc<Self>) -> BoxComputation<MutexGuard<T>> {
        Box::new(LockFuture {
            mutex: self.clone(),
            waiter: None,
            done: false,
        })
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        self.waiters.wake_one();
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Mutex");
        if self.locked.load(Ordering::Acquire) {
            d.field("data", &"<locked>");
        } else {
            // Safety: `locked` is false, so no `MutexGuard` can be
            // concurrently accessing `data`.
            d.field("data", unsafe { &*self.data.get() });
        }
        d.finish()
    }
}

struct LockFuture<T> {
    mutex: Arc<Mutex<T>>,
    waiter: Option<Waiter>,
    done: bool,
}

impl<T> LockFuture<T> {
    fn try_acquire(&mut self) -> Option<MutexGuard<T>> {
        self.mutex
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|()| {
                if let Some(w) = self.waiter.take() {
                    self.mutex.waiters.remove(&w);
                }
                self.done = true;
                MutexGuard {
                    mutex: self.mutex.clone(),
                }
            })
    }
}

impl<T> AsyncComputation<MutexGuard<T>> for LockFuture<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<MutexGuard<T>> {
        assert!(
            !self.done,
            "lock() future polled again after yielding its guard"
        );
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.mutex.waiters.push_back(cx.waker())),
        }
        // Close the register-then-check race against a concurrent unlock.
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.mutex.waiters.remove(&w);
        }
        self.done = true;
    }
}

/// An RAII guard: releases the [`Mutex`] and wakes the next waiter when
/// dropped.
pub struct MutexGuard<T: ?Sized> {
    mutex: Arc<Mutex<T>>,
}

impl<T: ?Sized> Deref for MutexGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        // Safety: holding a `MutexGuard` proves exclusive access.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: holding a `MutexGuard` proves exclusive access.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_sync;

    #[test]
    fn try_lock_then_unlock() {
        let mutex = Arc::new(Mutex::new(0));
        {
            let mut guard = mutex.try_lock().unwrap();
            *guard += 1;
        }
        assert_eq!(*mutex.try_lock().unwrap(), 1);
    }

    #[test]
    fn second_try_lock_fails_while_held() {
        let mutex = Arc::new(Mutex::new(()));
        let guard = mutex.try_lock().unwrap();
        assert!(mutex.try_lock().is_none());
        drop(guard);
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn lock_future_waits_for_release() {
        let mutex = Arc::new(Mutex::new(0));
        let held = mutex.try_lock().unwrap();

        let other = mutex.clone();
        let handle = std::thread::spawn(move || {
            let mut guard = run_sync(other.lock());
            *guard += 1;
        });

        std::thread::sleep(std::time::Duration::from_millis(10));
        drop(held);
        handle.join().unwrap();
        assert_eq!(*mutex.try_lock().unwrap(), 1);
    }
}
