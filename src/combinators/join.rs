// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum Join<T> {
    Outer(BoxComputation<BoxComputation<T>>),
    Inner(BoxComputation<T>),
    Done(T),
}

impl<T: Clone> AsyncComputation<T> for Join<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        loop {
            match self {
                Join::Done(v) => return Poll::Ready(v.clone()),
                Join::Outer(outer) => match outer.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(inner) => *self = Join::Inner(inner),
                },
                Join::Inner(inner) => match inner.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(v) => {
                        *self = Join::Done(v.clone());
                        return Poll::Ready(v);
                    }
                },
            }
        }
    }

    fn cancel(&mut self) {
        match self {
            Join::Outer(outer) => outer.cancel(),
            Join::Inner(inner) => inner.cancel(),
            Join::Done(_) => {}
        }
    }
}

/// Where `source` yields an inner computation, polls `source`; on
/// `Ready(inner)`, drops `source` and polls `inner` from then on. Flattens
/// a computation-of-a-computation into a single computation.
pub fn join<T>(source: BoxComputation<BoxComputation<T>>) -> BoxComputation<T>
where
    T: Clone + Send + 'static,
{
    Box::new(Join::Outer(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;

    #[test]
    fn flattens_a_computation_of_a_computation() {
        // BoxComputation<i32> isn't Clone, so the outer layer is built
        // directly from `create` rather than `ready`.
        let mut inner = Some(ready(5));
        let outer: BoxComputation<BoxComputation<i32>> =
            Box::new(crate::computation::create(
                move |_cx| Poll::Ready(inner.take().expect("polled twice")),
                || {},
            ));
        assert_eq!(run_sync(join(outer)), 5);
    }
}
