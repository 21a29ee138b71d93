// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::scheduler::SchedulerHandle;
use std::fmt;
use std::task::Waker;

/// The object passed into every [`poll`](crate::AsyncComputation::poll)
/// call.
///
/// Unlike [`core::task::Context`] (which this crate deliberately does not
/// reuse, see the module docs on [`crate`]), a `Context` additionally
/// carries an optional reference to the [`Scheduler`](crate::Scheduler)
/// that is driving the current poll, so that combinators spawned from
/// inside a computation can discover where to spawn onto. The reference is
/// borrowed for the duration of the poll call only; wakers captured from a
/// `Context` must not retain the `Context` itself.
pub struct Context<'a> {
    waker: &'a Waker,
    scheduler: Option<&'a dyn SchedulerHandle>,
}

impl<'a> Context<'a> {
    /// Build a `Context` from a waker, with no scheduler attached.
    ///
    /// This is what [`run_sync`](crate::run_sync) uses: "No scheduler
    /// reference is attached to the context" it constructs.
    #[must_use]
    pub fn from_waker(waker: &'a Waker) -> Self {
        Self {
            waker,
            scheduler: None,
        }
    }

    /// Build a `Context` from a waker and a scheduler handle.
    #[must_use]
    pub fn with_scheduler(waker: &'a Waker, scheduler: &'a dyn SchedulerHandle) -> Self {
        Self {
            waker,
            scheduler: Some(scheduler),
        }
    }

    /// The waker for this poll. Cloning it and calling
    /// [`Waker::wake`](std::task::Wake) is how a computation arranges to be
    /// polled again.
    #[must_use]
    pub fn waker(&self) -> &Waker {
        self.waker
    }

    /// The scheduler driving this poll, if any.
    #[must_use]
    pub fn scheduler(&self) -> Option<&dyn SchedulerHandle> {
        self.scheduler
    }

    /// Re-borrow this context for a nested poll call on a child computation.
    ///
    /// Combinators hand the *same* context down to their children so that a
    /// child's wake reaches the original driver.
    #[must_use]
    pub fn reborrow(&mut self) -> Context<'_> {
        Context {
            waker: self.waker,
            scheduler: self.scheduler,
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("waker", &self.waker)
            .field("has_scheduler", &self.scheduler.is_some())
            .finish()
    }
}
