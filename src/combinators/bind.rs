// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Bind<A, B, F> {
    Source(BoxComputation<A>, Option<F>),
    Next(BoxComputation<B>),
    Done(B),
}

impl<A, B, F> AsyncComputation<B> for Bind<A, B, F>
where
    B: Clone,
    F: FnOnce(A) -> BoxComputation<B>,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<B> {
        loop {
            match self {
                Bind::Source(source, binder) => match source.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(a) => {
                        let binder = binder
                            .take()
                            .expect("bind() source resolved more than once");
                        *self = Bind::Next(binder(a));
                    }
                },
                Bind::Next(next) => match next.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(b) => {
                        *self = Bind::Done(b.clone());
                        return Poll::Ready(b);
                    }
                },
                Bind::Done(b) => return Poll::Ready(b.clone()),
            }
        }
    }

    fn cancel(&mut self) {
        match self {
            Bind::Source(source, _) => source.cancel(),
            Bind::Next(next) => next.cancel(),
            Bind::Done(_) => {}
        }
    }
}

/// Polls `source`; on `Ready(a)`, computes `next = binder(a)`, drops
/// `source`, and polls `next` from then on. `cancel` forwards to whichever
/// of source/next is currently held. Memoizes the final value so re-polling
/// after completion stays idempotent.
pub fn bind<A, B, F>(binder: F, source: BoxComputation<A>) -> BoxComputation<B>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
    F: FnOnce(A) -> BoxComputation<B> + Send + 'static,
{
    Box::new(Bind::Source(source, Some(binder)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;

    #[test]
    fn chains_two_computations() {
        let comp = bind(|x: i32| ready(x * 2), ready(21));
        assert_eq!(run_sync(comp), 42);
    }

    #[test]
    fn repolling_after_ready_is_idempotent() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = bind(|x: i32| ready(x + 1), ready(1));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(2));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(2));
    }
}
