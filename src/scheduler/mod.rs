// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The scheduler contract: `spawn`/`JoinHandle` for handing computations
//! off to a driver, plus [`run_sync`], the minimal synchronous driver every
//! caller can use without spinning one up.

mod local;
mod park;
mod run_sync;

pub use local::LocalScheduler;
pub use run_sync::run_sync;

use crate::future::BoxFuture;
use crate::BoxComputation;

/// A Future whose completion can be awaited, cancelled, or blocked on from
/// outside the scheduler that's driving it.
///
/// A `JoinHandle` is itself a [`crate::Future`]: calling
/// [`run_computation`](crate::Future::run_computation) on it yields a fresh
/// [`AsyncComputation`](crate::AsyncComputation) that resolves once the
/// spawned work does.
pub trait JoinHandle<T>: crate::Future<T> {
    /// Request cancellation of the spawned computation. Idempotent,
    /// non-blocking; does not wait for the cancellation to take effect.
    fn cancel(&self);

    /// Block the calling thread until the spawned computation completes,
    /// returning its value.
    ///
    /// # Panics
    ///
    /// Panics if the spawned computation panicked, or if it was cancelled
    /// (surfacing [`crate::CancelledError`]).
    fn join(&self) -> T;
}

/// Something that can accept spawned work: a future factory or an
/// already-built computation, each yielding a [`JoinHandle`].
pub trait Scheduler {
    /// Spawn a fresh computation obtained from `future`, returning a handle
    /// to observe and control it.
    fn spawn<T>(&self, future: BoxFuture<T>) -> Box<dyn JoinHandle<T>>
    where
        T: Clone + Send + 'static;

    /// Spawn an already-built computation, returning a handle to observe
    /// and control it.
    fn spawn_computation<T>(&self, computation: BoxComputation<T>) -> Box<dyn JoinHandle<T>>
    where
        T: Clone + Send + 'static;
}

/// The object-safe subset of [`Scheduler`] threaded through
/// [`Context`](crate::Context), so a computation can discover where to
/// spawn fire-and-forget work onto without knowing the concrete scheduler
/// type.
///
/// `Scheduler::spawn` itself is generic over `T` and therefore not
/// object-safe; `spawn_detached` is the narrowed, type-erased escape hatch a
/// `dyn SchedulerHandle` can expose.
pub trait SchedulerHandle: Send + Sync {
    /// Spawn `computation`, discarding the join handle. Used by combinators
    /// that want to fan work out to the ambient scheduler without
    /// propagating a result back through the poll tree.
    fn spawn_detached(&self, computation: BoxComputation<()>);
}
