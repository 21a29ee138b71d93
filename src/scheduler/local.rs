// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A single-threaded, reference-counted [`Scheduler`] that ticks a run
//! queue of boxed computations round-robin.
//!
//! This is *one* concrete, fully specified scheduler so `spawn` is usable
//! in tests and downstream code; it deliberately does not attempt a
//! work-stealing, multi-core executor, whose internal design is out of
//! scope here.

use crate::future::BoxFuture;
use crate::once_var::OnceVar;
use crate::scheduler::{JoinHandle, Scheduler, SchedulerHandle};
use crate::{AsyncComputation, BoxComputation, Context};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Poll, RawWaker, RawWakerVTable, Waker};

struct Task {
    id: u64,
    comp: BoxComputation<()>,
    cancelled: Arc<AtomicBool>,
}

struct Shared {
    run_queue: Mutex<VecDeque<Task>>,
    parked: Mutex<HashMap<u64, Task>>,
    next_id: AtomicU64,
}

impl Shared {
    /// Move a parked task back onto the run queue. Called from a
    /// [`TaskWaker`], possibly from any thread, possibly while the task is
    /// itself mid-poll (the task will simply be re-polled on the next tick).
    fn wake(self: &Arc<Self>, id: u64) {
        let task = self.parked.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
        if let Some(task) = task {
            self.run_queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(task);
        }
    }
}

/// A single-threaded scheduler holding a FIFO run queue plus a side table
/// of parked (woken-on-demand) tasks. Cloning shares the same queues (it's
/// reference-counted); every clone schedules onto the same worker.
#[derive(Clone)]
pub struct LocalScheduler(Arc<Shared>);

impl LocalScheduler {
    /// An empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Shared {
            run_queue: Mutex::new(VecDeque::new()),
            parked: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }))
    }

    /// An empty scheduler, reserving `config`'s queue capacity hint up
    /// front.
    #[must_use]
    pub fn with_config(config: &crate::config::Config) -> Self {
        Self(Arc::new(Shared {
            run_queue: Mutex::new(VecDeque::with_capacity(config.queue_capacity_hint())),
            parked: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }))
    }

    /// Poll every task currently in the run queue exactly once. Tasks that
    /// return `Pending` move to the parked table until their waker fires;
    /// tasks that return `Ready` are dropped. Returns `true` if any task
    /// remains runnable or parked afterward.
    #[tracing::instrument(skip(self))]
    pub fn tick(&self) -> bool {
        let drained: Vec<Task> = {
            let mut queue = self.0.run_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain(..).collect()
        };

        let mut polled = 0usize;
        for mut task in drained {
            if task.cancelled.load(Ordering::Acquire) {
                task.comp.cancel();
                continue;
            }

            polled += 1;
            let waker = TaskWaker {
                shared: self.0.clone(),
                id: task.id,
            }
            .into_waker();
            let mut cx = Context::from_waker(&waker);
            match task.comp.poll(&mut cx) {
                Poll::Ready(()) => {}
                Poll::Pending => {
                    self.0
                        .parked
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(task.id, task);
                }
            }
        }

        tracing::trace!(polled, "local scheduler tick");
        let queue = self.0.run_queue.lock().unwrap_or_else(|e| e.into_inner());
        let parked = self.0.parked.lock().unwrap_or_else(|e| e.into_inner());
        !queue.is_empty() || !parked.is_empty()
    }

    /// Tick until every task has either completed or is parked waiting on
    /// an external wake (i.e. the run queue is empty). Does not block: if
    /// the queue empties with tasks still parked, this returns with those
    /// tasks outstanding.
    pub fn run_until_idle(&self) {
        loop {
            let more_runnable = !self
                .0
                .run_queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty();
            if !more_runnable {
                break;
            }
            self.tick();
        }
    }

    fn push(&self, comp: BoxComputation<()>, cancelled: Arc<AtomicBool>) -> u64 {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0
            .run_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Task { id, comp, cancelled });
        id
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A `Waker` that moves its task from the parked table back onto the run
/// queue when woken, from any thread.
struct TaskWaker {
    shared: Arc<Shared>,
    id: u64,
}

impl TaskWaker {
    fn into_waker(self) -> Waker {
        struct Payload {
            shared: Arc<Shared>,
            id: u64,
        }

        fn clone(raw: *const ()) -> RawWaker {
            // Safety: `raw` always originates from `Arc::into_raw::<Payload>`.
            unsafe {
                Arc::increment_strong_count(raw.cast::<Payload>());
            }
            RawWaker::new(raw, &VTABLE)
        }
        fn wake(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Payload>`.
            let payload = unsafe { Arc::from_raw(raw.cast::<Payload>()) };
            payload.shared.wake(payload.id);
        }
        fn wake_by_ref(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Payload>`,
            // and we hand back the refcount we briefly reconstructed.
            let payload = unsafe { Arc::from_raw(raw.cast::<Payload>()) };
            payload.shared.wake(payload.id);
            std::mem::forget(payload);
        }
        fn drop_waker(raw: *const ()) {
            // Safety: `raw` always originates from `Arc::into_raw::<Payload>`.
            unsafe {
                drop(Arc::from_raw(raw.cast::<Payload>()));
            }
        }

        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_waker);

        let payload = Arc::new(Payload {
            shared: self.shared,
            id: self.id,
        });
        let raw = RawWaker::new(Arc::into_raw(payload).cast::<()>(), &VTABLE);
        // Safety: the vtable functions above uphold the `RawWaker` contract.
        unsafe { Waker::from_raw(raw) }
    }
}

impl Scheduler for LocalScheduler {
    fn spawn<T>(&self, future: BoxFuture<T>) -> Box<dyn JoinHandle<T>>
    where
        T: Clone + Send + 'static,
    {
        self.spawn_computation(future.run_computation())
    }

    fn spawn_computation<T>(&self, computation: BoxComputation<T>) -> Box<dyn JoinHandle<T>>
    where
        T: Clone + Send + 'static,
    {
        let result: Arc<OnceVar<T>> = Arc::new(OnceVar::new());
        let cancelled = Arc::new(AtomicBool::new(false));

        let wrapped: BoxComputation<()> = Box::new(SpawnedTask {
            computation,
            result: result.clone(),
        });

        self.push(wrapped, cancelled.clone());

        Box::new(LocalJoinHandle { result, cancelled })
    }
}

/// Drives `computation` to completion, writing its value into `result`.
/// Unlike a `create`-built wrapper, `cancel` forwards into `computation`
/// rather than discarding it unpolled: the scheduler's run queue only ever
/// holds `BoxComputation<()>`, and this is the one place that type erasure
/// happens, so it's also the one place `cancel` must be wired through by
/// hand.
struct SpawnedTask<T> {
    computation: BoxComputation<T>,
    result: Arc<OnceVar<T>>,
}

impl<T: Clone> AsyncComputation<()> for SpawnedTask<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self.computation.poll(cx) {
            Poll::Ready(v) => {
                let _ = self.result.try_write(v);
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn cancel(&mut self) {
        self.computation.cancel();
    }
}

impl SchedulerHandle for LocalScheduler {
    fn spawn_detached(&self, computation: BoxComputation<()>) {
        self.push(computation, Arc::new(AtomicBool::new(false)));
    }
}

struct LocalJoinHandle<T> {
    result: Arc<OnceVar<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T: Clone + Send + 'static> crate::Future<T> for LocalJoinHandle<T> {
    fn run_computation(&self) -> BoxComputation<T> {
        Box::new(JoinResult {
            result: self.result.clone(),
        })
    }
}

impl<T: Clone + Send + 'static> JoinHandle<T> for LocalJoinHandle<T> {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.result.cancel();
    }

    fn join(&self) -> T {
        crate::run_sync(Box::new(JoinResult {
            result: self.result.clone(),
        }))
    }
}

struct JoinResult<T> {
    result: Arc<OnceVar<T>>,
}

impl<T: Clone> AsyncComputation<T> for JoinResult<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        self.result.poll_shared(cx)
    }

    fn cancel(&mut self) {
        self.result.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;

    #[test]
    fn spawn_and_join() {
        let sched = LocalScheduler::new();
        let handle = sched.spawn_computation(ready(42));
        sched.run_until_idle();
        assert_eq!(handle.join(), 42);
    }

    #[test]
    fn detached_spawn_runs() {
        let sched = LocalScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        sched.spawn_detached(Box::new(crate::computation::create(
            move |_cx| {
                flag.store(true, Ordering::SeqCst);
                Poll::Ready(())
            },
            || {},
        )));
        sched.run_until_idle();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn parked_task_resumes_after_external_wake() {
        let sched = LocalScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = sched.spawn_computation(Box::new(crate::computation::create(
            move |_cx| {
                if flag.load(Ordering::SeqCst) {
                    Poll::Ready(7)
                } else {
                    Poll::Pending
                }
            },
            || {},
        )));

        sched.run_until_idle();
        assert!(!sched.0.parked.lock().unwrap().is_empty());

        fired.store(true, Ordering::SeqCst);
        // Directly wake the parked task id 0 (the only task spawned so far).
        sched.0.wake(0);
        sched.run_until_idle();
        assert_eq!(handle.join(), 7);
    }

    #[test]
    fn cancelling_the_handle_forwards_into_the_computation() {
        struct TrackCancel {
            cancelled: Arc<AtomicBool>,
        }
        impl AsyncComputation<()> for TrackCancel {
            fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<()> {
                Poll::Pending
            }
            fn cancel(&mut self) {
                self.cancelled.store(true, Ordering::SeqCst);
            }
        }

        let sched = LocalScheduler::new();
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle =
            sched.spawn_computation(Box::new(TrackCancel { cancelled: cancelled.clone() }));

        handle.cancel();
        sched.run_until_idle();

        assert!(cancelled.load(Ordering::SeqCst));
    }
}
