// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::marker::PhantomData;
use std::task::Poll;

struct Never<T>(PhantomData<fn() -> T>);

impl<T> AsyncComputation<T> for Never<T> {
    fn poll(&mut self, _cx: &mut Context<'_>) -> Poll<T> {
        Poll::Pending
    }

    fn cancel(&mut self) {}
}

/// A computation that always returns `Pending`. `cancel` is a no-op.
///
/// Used for test scaffolding — e.g. as the losing side of `first` in
/// liveness tests, or as the inner computation a `delay` never gets around
/// to replacing.
pub fn never<T>() -> BoxComputation<T>
where
    T: Send + 'static,
{
    Box::new(Never(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_pending() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp: BoxComputation<i32> = never();
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
        comp.cancel();
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
    }
}
