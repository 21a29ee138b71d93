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

enum Catch<T> {
    Source(BoxComputation<T>),
    Done(Result<T, LatchedPanic>),
}

impl<T: Clone> AsyncComputation<Result<T, LatchedPanic>> for Catch<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<T, LatchedPanic>> {
        match self {
            Catch::Done(v) => Poll::Ready(v.clone()),
            Catch::Source(source) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| source.poll(cx))) {
                    Ok(Poll::Pending) => Poll::Pending,
                    Ok(Poll::Ready(v)) => {
                        let v = Ok(v);
                        *self = Catch::Done(v.clone());
                        Poll::Ready(v)
                    }
                    Err(payload) => {
                        let v = Err(LatchedPanic::capture(payload));
                        *self = Catch::Done(v.clone());
                        Poll::Ready(v)
                    }
                }
            }
        }
    }

    fn cancel(&mut self) {
        if let Catch::Source(source) = self {
            source.cancel();
        }
    }
}

/// Polls `source`; returns `Ready(Ok(v))` on `Ready(v)`, or `Ready(Err(e))`
/// if `source`'s poll panics. Cancellation is forwarded to `source`.
///
/// This is the one combinator that swallows a panic rather than propagating
/// it; every other combinator in this crate re-raises.
pub fn catch<T>(source: BoxComputation<T>) -> BoxComputation<Result<T, LatchedPanic>>
where
    T: Clone + Send + 'static,
{
    Box::new(Catch::Source(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;

    #[test]
    fn ready_source_is_wrapped_in_ok() {
        assert_eq!(run_sync(catch(ready(5))).unwrap(), 5);
    }

    #[test]
    fn panicking_source_is_wrapped_in_err() {
        let panicking: BoxComputation<i32> =
            Box::new(crate::computation::create(|_cx| panic!("boom"), || {}));
        let result = run_sync(catch(panicking));
        let err = result.unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn repolling_after_ready_is_idempotent() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = catch(ready(5));
        assert_eq!(comp.poll(&mut cx).map(|r| r.unwrap()), Poll::Ready(5));
        assert_eq!(comp.poll(&mut cx).map(|r| r.unwrap()), Poll::Ready(5));
    }
}
