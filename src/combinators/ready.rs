// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

struct Ready<T>(Option<T>);

impl<T: Clone> AsyncComputation<T> for Ready<T> {
    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<T> {
        // idempotent after Ready: keep returning the same value rather than
        // panicking on a second `take()`.
        let value = self.0.clone().expect("ready() polled before construction");
        Poll::Ready(value)
    }

    fn cancel(&mut self) {
        // no resources held, nothing to do.
    }
}

/// A computation that returns `Ready(v)` immediately, on every poll.
/// `cancel` is a no-op.
pub fn ready<T>(v: T) -> BoxComputation<T>
where
    T: Clone + Send + 'static,
{
    Box::new(Ready(Some(v)))
}

/// The `ready(())` singleton, spelled out as its own combinator because it
/// is by far the most common terminal computation (`do!`/`use` sugar
/// desugars to it).
pub fn unit() -> BoxComputation<()> {
    ready(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_sync;

    #[test]
    fn resolves_immediately() {
        assert_eq!(run_sync(ready(42)), 42);
    }

    #[test]
    fn repolling_after_ready_is_idempotent() {
        let waker = crate::test_support::noop_waker();
        let mut comp = ready("x");
        let mut cx = Context::from_waker(&waker);
        assert_eq!(comp.poll(&mut cx), Poll::Ready("x"));
        assert_eq!(comp.poll(&mut cx), Poll::Ready("x"));
    }

    #[test]
    fn unit_resolves_to_unit() {
        assert_eq!(run_sync(unit()), ());
    }
}
