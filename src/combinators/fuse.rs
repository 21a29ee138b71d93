// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::CancelledError;
use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

/// Wraps a computation so that any poll after [`cancel`](Self::cancel) is
/// called deterministically panics with [`CancelledError`] instead of
/// falling into this crate's general "racing poll after cancel is
/// unspecified" rule.
///
/// This is opt-in — most combinators in this crate do not pay for the extra
/// branch on every poll — and is mainly useful for tests and debugging.
pub struct CancellationFuse<T> {
    inner: BoxComputation<T>,
    cancelled: bool,
}

impl<T> CancellationFuse<T> {
    /// Wrap `inner` in a fuse.
    pub fn new(inner: BoxComputation<T>) -> Self {
        Self {
            inner,
            cancelled: false,
        }
    }
}

impl<T> AsyncComputation<T> for CancellationFuse<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        if self.cancelled {
            panic!("{}", CancelledError::new());
        }
        self.inner.poll(cx)
    }

    fn cancel(&mut self) {
        self.inner.cancel();
        self.cancelled = true;
    }
}

/// Wrap `inner` so that polling it after cancellation panics with
/// [`CancelledError`] instead of exercising the inner computation's
/// unspecified racing behavior.
pub fn fuse<T>(inner: BoxComputation<T>) -> BoxComputation<T>
where
    T: Send + 'static,
{
    Box::new(CancellationFuse::new(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{never, ready};
    use crate::run_sync;

    #[test]
    fn forwards_polls_until_cancelled() {
        assert_eq!(run_sync(fuse(ready(5))), 5);
    }

    #[test]
    #[should_panic]
    fn polling_after_cancel_panics() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = fuse(never::<i32>());
        comp.cancel();
        let _ = comp.poll(&mut cx);
    }
}
