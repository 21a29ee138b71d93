// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::Context;
use std::task::Poll;

/// A resource-holding, pollable, cancellable unit of asynchronous work.
///
/// This is the crate's two-method capability set: [`poll`](Self::poll) and
/// [`cancel`](Self::cancel). It intentionally has no `Pin` requirement —
/// every implementation in this crate owns its children by value
/// (`Box<dyn AsyncComputation<_>>`) rather than by self-reference, so there
/// is nothing to pin.
///
/// # Invariants
///
/// - After [`cancel`](Self::cancel), calling [`poll`](Self::poll) again is
///   unspecified unless the computation was built with
///   [`CancellationFuse`](crate::combinators::CancellationFuse), in which
///   case it raises [`CancelledError`](crate::CancelledError).
/// - [`cancel`](Self::cancel) is idempotent.
/// - Once `poll` returns `Ready(v)`, every subsequent `poll` must return
///   `Ready(v')` with `v' == v` (structurally). This crate's own
///   combinators uphold it by memoizing; user implementations must do the
///   same if they may be polled again after `Ready`.
pub trait AsyncComputation<T> {
    /// Attempt to drive this computation one step further.
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T>;

    /// Cancel this computation. Idempotent, non-blocking, callable from any
    /// thread at any time.
    fn cancel(&mut self);
}

impl<T> AsyncComputation<T> for Box<dyn AsyncComputation<T> + Send> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        (**self).poll(cx)
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }
}

/// A boxed, type-erased, `Send` computation. Combinators that hold
/// heterogeneous children store them as this alias rather than a named
/// generic field, mirroring how this crate's combinators are implemented
/// as free functions rather than a struct per combinator.
pub type BoxComputation<T> = Box<dyn AsyncComputation<T> + Send>;

struct FnComputation<P, C> {
    poll: P,
    cancel: Option<C>,
}

impl<T, P, C> AsyncComputation<T> for FnComputation<P, C>
where
    P: FnMut(&mut Context<'_>) -> Poll<T>,
    C: FnMut(),
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        (self.poll)(cx)
    }

    fn cancel(&mut self) {
        if let Some(cancel) = &mut self.cancel {
            cancel();
        }
    }
}

/// Build an [`AsyncComputation`] from a `poll` closure and a `cancel`
/// closure.
///
/// This is the primitive escape hatch most of this crate's own combinators
/// are implemented in terms of.
pub fn create<T, P, C>(poll: P, cancel: C) -> impl AsyncComputation<T>
where
    P: FnMut(&mut Context<'_>) -> Poll<T>,
    C: FnMut(),
{
    FnComputation {
        poll,
        cancel: Some(cancel),
    }
}

struct MemoComputation<T, P, C> {
    poll: Option<P>,
    cancel: Option<C>,
    value: Option<T>,
}

impl<T, P, C> AsyncComputation<T> for MemoComputation<T, P, C>
where
    T: Clone,
    P: FnMut(&mut Context<'_>) -> Poll<T>,
    C: FnMut(),
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(v) = &self.value {
            return Poll::Ready(v.clone());
        }
        let poll = self.poll.as_mut().expect("poll closure dropped before Ready");
        match poll(cx) {
            Poll::Ready(v) => {
                self.value = Some(v.clone());
                // neither closure is needed once the value is memoized.
                self.poll = None;
                self.cancel = None;
                Poll::Ready(v)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn cancel(&mut self) {
        if self.value.is_none() {
            if let Some(cancel) = &mut self.cancel {
                cancel();
            }
        }
    }
}

/// Like [`create`], but memoizes the first `Ready` value and serves every
/// subsequent poll from the cache without invoking `poll` again.
///
/// Needed by any combinator whose inner structure may be polled again
/// after `Ready` (e.g. `apply`), so it can still satisfy the
/// idempotent-after-Ready contract without re-running already-finished
/// children.
pub fn create_memo<T, P, C>(poll: P, cancel: C) -> impl AsyncComputation<T>
where
    T: Clone,
    P: FnMut(&mut Context<'_>) -> Poll<T>,
    C: FnMut(),
{
    MemoComputation {
        poll: Some(poll),
        cancel: Some(cancel),
        value: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn create_memo_invokes_poll_only_until_ready() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poll_calls = calls.clone();
        let mut comp = create_memo(
            move |_cx: &mut Context<'_>| {
                poll_calls.fetch_add(1, Ordering::SeqCst);
                Poll::Ready(5)
            },
            || {},
        );

        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(comp.poll(&mut cx), Poll::Ready(5));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(5));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn create_memo_does_not_cancel_after_ready() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let on_cancel = cancelled.clone();
        let mut comp = create_memo(|_cx: &mut Context<'_>| Poll::Ready(1), move || {
            on_cancel.fetch_add(1, Ordering::SeqCst);
        });

        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(comp.poll(&mut cx), Poll::Ready(1));
        comp.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }
}
