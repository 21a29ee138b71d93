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

enum Side<T> {
    Pending(BoxComputation<T>),
    Done(T),
    Cancelled,
}

impl<T: Clone> Side<T> {
    fn cancel(&mut self) {
        if let Side::Pending(comp) = self {
            comp.cancel();
        }
        *self = Side::Cancelled;
    }
}

fn poll_side<T: Clone>(side: &mut Side<T>, cx: &mut Context<'_>) -> Result<Poll<T>, LatchedPanic> {
    match side {
        Side::Done(v) => Ok(Poll::Ready(v.clone())),
        Side::Cancelled => Ok(Poll::Pending),
        Side::Pending(comp) => {
            match std::panic::catch_unwind(AssertUnwindSafe(|| comp.poll(cx))) {
                Ok(Poll::Pending) => Ok(Poll::Pending),
                Ok(Poll::Ready(v)) => {
                    *side = Side::Done(v.clone());
                    Ok(Poll::Ready(v))
                }
                Err(payload) => Err(LatchedPanic::capture(payload)),
            }
        }
    }
}

enum Merge<A, B> {
    Running(Side<A>, Side<B>),
    Panicked(LatchedPanic),
    Done((A, B)),
}

impl<A, B> AsyncComputation<(A, B)> for Merge<A, B>
where
    A: Clone,
    B: Clone,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<(A, B)> {
        match self {
            Merge::Done(v) => return Poll::Ready(v.clone()),
            Merge::Panicked(panic) => panic.resume(),
            Merge::Running(..) => {}
        }
        let Merge::Running(a, b) = self else {
            unreachable!()
        };
        // left-first, then right; both sides are always polled.
        let a_result = poll_side(a, cx);
        let b_result = poll_side(b, cx);
        match (a_result, b_result) {
            (Err(panic), _) => {
                b.cancel();
                *self = Merge::Panicked(panic.clone());
                panic.resume();
            }
            (_, Err(panic)) => {
                a.cancel();
                *self = Merge::Panicked(panic.clone());
                panic.resume();
            }
            (Ok(Poll::Ready(a)), Ok(Poll::Ready(b))) => {
                let v = (a, b);
                *self = Merge::Done(v.clone());
                Poll::Ready(v)
            }
            _ => Poll::Pending,
        }
    }

    fn cancel(&mut self) {
        if let Merge::Running(a, b) = self {
            a.cancel();
            b.cancel();
        }
    }
}

/// Polls `a` and `b` on every outer poll, left then right, independent of
/// each other's readiness; once both have produced a value, returns
/// `Ready((va, vb))` and memoizes it.
///
/// If either side panics, the other is cancelled and a message-equivalent
/// panic is re-raised on every subsequent poll.
pub fn merge<A, B>(a: BoxComputation<A>, b: BoxComputation<B>) -> BoxComputation<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    Box::new(Merge::Running(Side::Pending(a), Side::Pending(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{never, ready};
    use crate::run_sync;

    #[test]
    fn resolves_once_both_sides_are_ready() {
        assert_eq!(run_sync(merge(ready("a"), ready(1))), ("a", 1));
    }

    #[test]
    fn pending_while_either_side_is_pending() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = merge(never::<i32>(), ready(1));
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panic_on_one_side_cancels_the_other_and_reraises() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let panicking: BoxComputation<i32> = Box::new(crate::computation::create(
            |_cx| panic!("boom"),
            || {},
        ));
        let mut comp = merge(panicking, never::<i32>());
        let _ = comp.poll(&mut cx);
    }
}
