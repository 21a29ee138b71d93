// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Delay<T, F> {
    Uncreated(Option<F>),
    Created(BoxComputation<T>),
    Cancelled,
}

impl<T, F> AsyncComputation<T> for Delay<T, F>
where
    F: FnOnce() -> BoxComputation<T>,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        match self {
            Delay::Created(inner) => inner.poll(cx),
            Delay::Cancelled => Poll::Pending,
            Delay::Uncreated(creator) => {
                let creator = creator
                    .take()
                    .expect("delay() polled after its creator already ran");
                let mut inner = creator();
                let out = inner.poll(cx);
                *self = Delay::Created(inner);
                out
            }
        }
    }

    fn cancel(&mut self) {
        match self {
            Delay::Created(inner) => inner.cancel(),
            Delay::Uncreated(_) => *self = Delay::Cancelled,
            Delay::Cancelled => {}
        }
    }
}

/// Defers building the inner computation until the first poll.
///
/// On first poll, invokes `creator` to build the inner computation and
/// immediately polls it; every subsequent poll forwards to the inner
/// computation. `cancel` forwards to the inner computation once it exists,
/// otherwise marks the delay as cancelled so `creator` never runs.
pub fn delay<T, F>(creator: F) -> BoxComputation<T>
where
    T: Send + 'static,
    F: FnOnce() -> BoxComputation<T> + Send + 'static,
{
    Box::new(Delay::Uncreated(Some(creator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{never, ready};
    use crate::run_sync;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn creator_runs_on_first_poll_only() {
        let created = Arc::new(AtomicBool::new(false));
        let flag = created.clone();
        let comp = delay(move || {
            flag.store(true, Ordering::SeqCst);
            ready(10)
        });
        assert!(!created.load(Ordering::SeqCst));
        assert_eq!(run_sync(comp), 10);
        assert!(created.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_before_creation_prevents_it() {
        let created = Arc::new(AtomicBool::new(false));
        let flag = created.clone();
        let mut comp: BoxComputation<()> = delay(move || {
            flag.store(true, Ordering::SeqCst);
            never()
        });
        comp.cancel();
        assert!(!created.load(Ordering::SeqCst));
    }
}
