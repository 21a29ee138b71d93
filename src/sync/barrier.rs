// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::waitqueue::{Waiter, WaitQueue};
use crate::{AsyncComputation, BoxComputation, Context};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;

/// A reusable rendezvous point for a fixed number of waiters: a `Barrier`
/// has a fixed capacity, and each generation releases all of its waiters
/// together once `capacity` calls to `wait()` have arrived. Waiters park
/// via a [`WaitQueue`] rather than busy-looping on the generation counter.
pub struct Barrier {
    capacity: usize,
    state: Mutex<State>,
    waiters: WaitQueue,
    generation: AtomicUsize,
}

struct State {
    arrived: usize,
}

impl Barrier {
    /// A barrier that releases once `capacity` waiters have called `wait()`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Barrier capacity must be at least 1");
        Self {
            capacity,
            state: Mutex::new(State { arrived: 0 }),
            waiters: WaitQueue::new(),
            generation: AtomicUsize::new(0),
        }
    }

    /// A computation that resolves once `capacity` callers across all
    /// clones of this barrier have called `wait()`. Exactly one of them
    /// resolves with [`BarrierWaitResult::is_leader`] true per generation.
    pub fn wait(self: &Arc<Self>) -> BoxComputation<BarrierWaitResult> {
        let generation = self.generation.load(Ordering::Acquire);
        Box::new(Wait {
            barrier: self.clone(),
            generation,
            arrived: false,
            is_leader: false,
            waiter: None,
            done: false,
        })
    }
}

struct Wait {
    barrier: Arc<Barrier>,
    generation: usize,
    arrived: bool,
    // Whether this call tipped the arrival count over `capacity`; set once
    // in `poll`, read back in `try_complete`.
    is_leader: bool,
    waiter: Option<Waiter>,
    done: bool,
}

impl Wait {
    /// Returns `Some` once this waiter's generation has released.
    fn try_complete(&mut self) -> Option<BarrierWaitResult> {
        if self.barrier.generation.load(Ordering::Acquire) != self.generation {
            if let Some(w) = self.waiter.take() {
                self.barrier.waiters.remove(&w);
            }
            self.done = true;
            return Some(BarrierWaitResult {
                is_leader: self.is_leader,
            });
        }
        None
    }
}

impl AsyncComputation<BarrierWaitResult> for Wait {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<BarrierWaitResult> {
        assert!(
            !self.done,
            "wait() future polled again after yielding its result"
        );

        if !self.arrived {
            self.arrived = true;
            let mut state = self
                .barrier
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            state.arrived += 1;
            if state.arrived == self.barrier.capacity {
                state.arrived = 0;
                self.is_leader = true;
                drop(state);
                self.barrier.generation.fetch_add(1, Ordering::AcqRel);
                self.barrier.waiters.wake_all();
            } else {
                self.is_leader = false;
            }
        }

        if let Some(result) = self.try_complete() {
            return Poll::Ready(result);
        }

        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.barrier.waiters.push_back(cx.waker())),
        }
        if let Some(result) = self.try_complete() {
            return Poll::Ready(result);
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.barrier.waiters.remove(&w);
        }
        self.done = true;
    }
}

/// The outcome of [`Barrier::wait`]: exactly one waiter per generation
/// observes `is_leader() == true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
}

impl BarrierWaitResult {
    /// Whether this call to `wait()` was the one that released the barrier.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_waiter_barrier_releases_immediately() {
        let barrier = Arc::new(Barrier::new(1));
        let result = crate::run_sync(barrier.wait());
        assert!(result.is_leader());
    }

    #[test]
    fn exactly_one_leader_per_generation() {
        let barrier = Arc::new(Barrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let b = barrier.clone();
                std::thread::spawn(move || crate::run_sync(b.wait()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_leader()).count(), 1);
    }

    #[test]
    fn barrier_is_reusable_across_generations() {
        let barrier = Arc::new(Barrier::new(2));
        for _ in 0..3 {
            let b1 = barrier.clone();
            let b2 = barrier.clone();
            let h1 = std::thread::spawn(move || crate::run_sync(b1.wait()));
            let h2 = std::thread::spawn(move || crate::run_sync(b2.wait()));
            let r1 = h1.join().unwrap();
            let r2 = h2.join().unwrap();
            assert_ne!(r1.is_leader(), r2.is_leader());
        }
    }
}
