// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::waitqueue::{Waiter, WaitQueue};
use crate::{AsyncComputation, BoxComputation, Context};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;

/// A counting semaphore: up to `permits` concurrent holders of a
/// [`SemaphorePermit`] (or of `n` permits each, via `acquire_many`).
///
/// Built from the same `WaitQueue` register-then-recheck skeleton as
/// [`super::Notify`] and [`super::Mutex`], generalized from "one bit" to "a
/// saturating counter".
pub struct Semaphore {
    permits: AtomicUsize,
    waiters: WaitQueue,
}

impl Semaphore {
    /// A semaphore starting with `permits` available permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
            waiters: WaitQueue::new(),
        }
    }

    /// The number of permits currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }

    /// Non-blocking: acquires one permit if available.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SemaphorePermit> {
        self.try_acquire_many(1)
    }

    /// Non-blocking: acquires `n` permits if that many are available.
    pub fn try_acquire_many(self: &Arc<Self>, n: usize) -> Option<SemaphorePermit> {
        let mut current = self.permits.load(Ordering::Acquire);
        loop {
            if current < n {
                return None;
            }
            match self.permits.compare_exchange_weak(
                current,
                current - n,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Some(SemaphorePermit {
                        semaphore: self.clone(),
                        count: n,
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// A computation that resolves to one permit once available.
    pub fn acquire(self: &Arc<Self>) -> BoxComputation<SemaphorePermit> {
        self.acquire_many(1)
    }

    /// A computation that resolves once `n` permits are simultaneously
    /// available, yielding a single [`SemaphorePermit`] worth `n`.
    pub fn acquire_many(self: &Arc<Self>, n: usize) -> BoxComputation<SemaphorePermit> {
        Box::new(Acquire {
            semaphore: self.clone(),
            n,
            waiter: None,
            done: false,
        })
    }

    fn release(&self, n: usize) {
        self.permits.fetch_add(n, Ordering::Release);
        self.waiters.wake_all();
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("available_permits", &self.available_permits())
            .finish()
    }
}

struct Acquire {
    semaphore: Arc<Semaphore>,
    n: usize,
    waiter: Option<Waiter>,
    done: bool,
}

impl Acquire {
    fn try_acquire(&mut self) -> Option<SemaphorePermit> {
        let permit = self.semaphore.try_acquire_many(self.n)?;
        if let Some(w) = self.waiter.take() {
            self.semaphore.waiters.remove(&w);
        }
        self.done = true;
        Some(permit)
    }
}

impl AsyncComputation<SemaphorePermit> for Acquire {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<SemaphorePermit> {
        assert!(
            !self.done,
            "acquire() future polled again after yielding its permit"
        );
        if let Some(permit) = self.try_acquire() {
            return Poll::Ready(permit);
        }
        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.semaphore.waiters.push_back(cx.waker())),
        }
        if let Some(permit) = self.try_acquire() {
            return Poll::Ready(permit);
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.semaphore.waiters.remove(&w);
        }
        self.done = true;
    }
}

/// An RAII permit: releases its share back to the [`Semaphore`] on drop.
pub struct SemaphorePermit {
    semaphore: Arc<Semaphore>,
    count: usize,
}

impl SemaphorePermit {
    /// Permanently removes `self`'s permits from the semaphore's pool
    /// instead of returning them on drop.
    pub fn forget(mut self) {
        self.count = 0;
    }
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        if self.count > 0 {
            self.semaphore.release(self.count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_respects_capacity() {
        let sem = Arc::new(Semaphore::new(2));
        let p1 = sem.try_acquire().unwrap();
        let p2 = sem.try_acquire().unwrap();
        assert!(sem.try_acquire().is_none());
        drop(p1);
        assert_eq!(sem.available_permits(), 1);
        let _p3 = sem.try_acquire().unwrap();
        drop(p2);
    }

    #[test]
    fn acquire_many_blocks_until_enough_available() {
        let sem = Arc::new(Semaphore::new(3));
        let p = sem.try_acquire_many(2).unwrap();
        assert!(sem.try_acquire_many(2).is_none());
        drop(p);
        assert!(sem.try_acquire_many(2).is_some());
    }

    #[test]
    fn forget_permanently_shrinks_pool() {
        let sem = Arc::new(Semaphore::new(1));
        let p = sem.try_acquire().unwrap();
        p.forget();
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn acquire_future_waits_for_release() {
        let sem = Arc::new(Semaphore::new(1));
        let held = sem.try_acquire().unwrap();

        let other = sem.clone();
        let handle = std::thread::spawn(move || {
            let _permit = crate::run_sync(other.acquire());
        });

        std::thread::sleep(std::time::Duration::from_millis(10));
        drop(held);
        handle.join().unwrap();
    }
}
