// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::LatchedPanic;
use crate::{AsyncComputation, BoxComputation, Context};
use std::panic::AssertUnwindSafe;
use std::task::Poll;

enum First<T> {
    Running(BoxComputation<T>, BoxComputation<T>),
    Panicked(LatchedPanic),
    Done(T),
}

impl<T: Clone> AsyncComputation<T> for First<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        match self {
            First::Done(v) => return Poll::Ready(v.clone()),
            First::Panicked(panic) => panic.resume(),
            First::Running(..) => {}
        }
        let First::Running(a, b) = self else {
            unreachable!()
        };
        // left is polled first; ties favor left.
        match std::panic::catch_unwind(AssertUnwindSafe(|| a.poll(cx))) {
            Ok(Poll::Ready(v)) => {
                b.cancel();
                *self = First::Done(v.clone());
                return Poll::Ready(v);
            }
            Ok(Poll::Pending) => {}
            Err(payload) => {
                let panic = LatchedPanic::capture(payload);
                b.cancel();
                *self = First::Panicked(panic.clone());
                panic.resume();
            }
        }
        match std::panic::catch_unwind(AssertUnwindSafe(|| b.poll(cx))) {
            Ok(Poll::Ready(v)) => {
                a.cancel();
                *self = First::Done(v.clone());
                Poll::Ready(v)
            }
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => {
                let panic = LatchedPanic::capture(payload);
                a.cancel();
                *self = First::Panicked(panic.clone());
                panic.resume();
            }
        }
    }

    fn cancel(&mut self) {
        if let First::Running(a, b) = self {
            a.cancel();
            b.cancel();
        }
    }
}

/// Polls `a`, then `b`. On the first `Ready` from either side, cancels the
/// other and returns that value. Ties favor `a`.
///
/// Same exception contagion policy as [`merge`](super::merge): a panic on
/// either side cancels the other and re-raises an equivalent panic on every
/// subsequent poll.
pub fn first<T>(a: BoxComputation<T>, b: BoxComputation<T>) -> BoxComputation<T>
where
    T: Clone + Send + 'static,
{
    Box::new(First::Running(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{never, ready};
    use crate::run_sync;

    #[test]
    fn left_wins_when_both_ready() {
        assert_eq!(run_sync(first(ready(1), ready(2))), 1);
    }

    #[test]
    fn whichever_side_is_ready_wins() {
        assert_eq!(run_sync(first(never(), ready(9))), 9);
    }

    #[test]
    fn pending_when_neither_side_is_ready() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp: BoxComputation<i32> = first(never(), never());
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
    }
}
