// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Slot<T> {
    Pending(BoxComputation<T>),
    Done(T),
}

impl<T: Clone> Slot<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        match self {
            Slot::Done(v) => Poll::Ready(v.clone()),
            Slot::Pending(comp) => match comp.poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(v) => {
                    *self = Slot::Done(v.clone());
                    Poll::Ready(v)
                }
            },
        }
    }

    fn cancel(&mut self) {
        if let Slot::Pending(comp) = self {
            comp.cancel();
        }
    }
}

enum Apply<F, V, R> {
    Running { f: Slot<F>, v: Slot<V> },
    Done(R),
}

impl<F, V, R> AsyncComputation<R> for Apply<F, V, R>
where
    F: FnOnce(V) -> R + Clone,
    V: Clone,
    R: Clone,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<R> {
        match self {
            Apply::Done(r) => Poll::Ready(r.clone()),
            Apply::Running { f, v } => {
                // both factors are polled on every outer poll, left-first.
                let f_ready = f.poll(cx);
                let v_ready = v.poll(cx);
                match (f_ready, v_ready) {
                    (Poll::Ready(f), Poll::Ready(v)) => {
                        let r = f(v);
                        *self = Apply::Done(r.clone());
                        Poll::Ready(r)
                    }
                    _ => Poll::Pending,
                }
            }
        }
    }

    fn cancel(&mut self) {
        if let Apply::Running { f, v } = self {
            f.cancel();
            v.cancel();
        }
    }
}

/// Polls both factor computations each call; when both are `Ready`, emits
/// `Ready(f(v))`. Memoizes.
pub fn apply<F, V, R>(f_f: BoxComputation<F>, v_f: BoxComputation<V>) -> BoxComputation<R>
where
    F: FnOnce(V) -> R + Clone + Send + 'static,
    V: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    Box::new(Apply::Running {
        f: Slot::Pending(f_f),
        v: Slot::Pending(v_f),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{never, ready};
    use crate::run_sync;

    #[test]
    fn applies_once_both_sides_are_ready() {
        let comp = apply(ready(|x: i32| x * 2), ready(21));
        assert_eq!(run_sync(comp), 42);
    }

    #[test]
    fn pending_while_either_side_is_pending() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = apply(never::<fn(i32) -> i32>(), ready(1));
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
    }
}
