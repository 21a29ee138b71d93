// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A cooperative, poll-based asynchronous computation core.
//!
//! The central trait is [`AsyncComputation`]: a two-method capability set
//! (`poll`, `cancel`) rather than `std::future::Future`'s single `poll`
//! method. Three deliberate departures from `std::future` follow from that:
//!
//! - **No `Pin`.** Every computation in this crate owns its children by
//!   value (`Box<dyn AsyncComputation<_>>`), never by self-reference, so
//!   there is nothing `Pin` would protect. Combinators move their boxed
//!   children around freely.
//! - **Explicit `cancel`.** `std::future::Future` models cancellation
//!   implicitly, by dropping the future. This crate makes it a first-class
//!   operation so that a computation can distinguish "dropped without
//!   cancellation" (never happens here — nothing is ever silently dropped
//!   mid-flight by this crate's own combinators) from "cancelled, then
//!   possibly polled again", which is exactly the case
//!   [`combinators::CancellationFuse`] exists to make well-defined.
//! - **A bespoke [`Context`], not [`core::task::Context`].** This crate's
//!   `Context` additionally threads an optional
//!   [`SchedulerHandle`](scheduler::SchedulerHandle) reference through each
//!   poll, so a computation built deep inside a combinator tree can still
//!   discover where to spawn detached work. [`core::task::Poll`] and
//!   [`core::task::Waker`] are reused as-is — there is nothing
//!   future-specific about either of them.
//!
//! Host-language exceptions are modeled as ordinary Rust panics propagated
//! through `poll`, not as a `Result` error channel; [`combinators::catch`]
//! is the one combinator that converts a panic into a value.

mod combinators;
mod computation;
mod config;
mod context;
mod error;
mod future;
mod once_var;
mod scheduler;
mod sync;
#[cfg(test)]
mod test_support;
mod time;
mod waitqueue;

pub use combinators::{
    apply, bind, catch, delay, first, fuse, ignore, join, lazy, map, merge, never, ready, seq_iter,
    unit, yield_now, CancellationFuse,
};
pub use computation::{create, create_memo, AsyncComputation, BoxComputation};
pub use config::Config;
pub use context::Context;
pub use error::{CancelledError, LatchedPanic, OnceVarDoubleWriteError};
pub use future::{BoxFuture, Future};
pub use once_var::OnceVar;
pub use scheduler::{run_sync, JoinHandle, LocalScheduler, Scheduler, SchedulerHandle};
pub use sync::{Barrier, BarrierWaitResult, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit};
pub use time::{sleep, sleep_until, sleep_with_clock, Clock, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;

    /// An end-to-end smoke test exercising the public surface across
    /// modules: spawn a computation built from several combinators onto a
    /// scheduler, join it, and confirm the result.
    #[test]
    fn combinators_and_scheduler_compose() {
        let sched = LocalScheduler::new();
        let handle = sched.spawn_computation(map(
            |(a, b): (i32, i32)| a + b,
            merge(ready(1), delay(|| ready(41))),
        ));
        sched.run_until_idle();
        assert_eq!(handle.join(), 42);
    }

    #[test]
    fn run_sync_drives_bind_chain() {
        let result = run_sync(bind(|x: i32| ready(x * 2), ready(21)));
        assert_eq!(result, 42);
    }
}
