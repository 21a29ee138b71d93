// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Map<A, B, F> {
    Source(BoxComputation<A>, Option<F>),
    Done(B),
}

impl<A, B, F> AsyncComputation<B> for Map<A, B, F>
where
    B: Clone,
    F: FnOnce(A) -> B,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<B> {
        match self {
            Map::Done(b) => Poll::Ready(b.clone()),
            Map::Source(source, f) => match source.poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(a) => {
                    let f = f.take().expect("map() source resolved more than once");
                    let b = f(a);
                    *self = Map::Done(b.clone());
                    Poll::Ready(b)
                }
            },
        }
    }

    fn cancel(&mut self) {
        if let Map::Source(source, _) = self {
            source.cancel();
        }
    }
}

/// `map(f, source)` is `bind` with the degenerate binder that lifts `f`
/// into `ready`. Memoizes the mapped value.
pub fn map<A, B, F>(f: F, source: BoxComputation<A>) -> BoxComputation<B>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
    F: FnOnce(A) -> B + Send + 'static,
{
    Box::new(Map::Source(source, Some(f)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;

    #[test]
    fn maps_the_ready_value() {
        assert_eq!(run_sync(map(|x: i32| x + 1, ready(41))), 42);
    }

    #[test]
    fn repolling_after_ready_is_idempotent() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = map(|x: i32| x.to_string(), ready(5));
        assert_eq!(comp.poll(&mut cx), Poll::Ready("5".to_string()));
        assert_eq!(comp.poll(&mut cx), Poll::Ready("5".to_string()));
    }
}
