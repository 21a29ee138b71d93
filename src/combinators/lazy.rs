// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Lazy<T, F> {
    Pending(Option<F>),
    Done(T),
}

impl<T, F> AsyncComputation<T> for Lazy<T, F>
where
    T: Clone,
    F: FnOnce() -> T,
{
    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<T> {
        match self {
            Lazy::Done(v) => Poll::Ready(v.clone()),
            Lazy::Pending(f) => {
                let f = f.take().expect("lazy() polled after panic in its closure");
                let v = f();
                *self = Lazy::Done(v.clone());
                Poll::Ready(v)
            }
        }
    }

    fn cancel(&mut self) {
        // evaluation is synchronous; there's nothing in flight to cancel,
        // but a not-yet-evaluated closure is simply dropped unexecuted.
        if let Lazy::Pending(f) = self {
            *f = None;
        }
    }
}

/// Evaluates `f` on first poll, memoizes the result, then returns
/// `Ready(result)` on every poll thereafter — `f` is never called again.
pub fn lazy<T, F>(f: F) -> BoxComputation<T>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Box::new(Lazy::Pending(Some(f)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_sync;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn evaluates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let mut comp = lazy(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            7
        });
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(comp.poll(&mut cx), Poll::Ready(7));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelling_before_first_poll_skips_evaluation() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counted = ran.clone();
        let mut comp = lazy(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        comp.cancel();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_sync_drives_it() {
        assert_eq!(run_sync(lazy(|| 3 + 4)), 7);
    }
}
