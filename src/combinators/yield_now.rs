// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl AsyncComputation<()> for YieldNow {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }

    fn cancel(&mut self) {
        self.yielded = true;
    }
}

/// Returns `Pending` on the first poll (after waking its own waker), then
/// `Ready(())` on the second. An explicit suspension point used to break up
/// long synchronous runs.
pub fn yield_now() -> BoxComputation<()> {
    Box::new(YieldNow::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pends_once_then_resolves() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = yield_now();
        assert_eq!(comp.poll(&mut cx), Poll::Pending);
        assert_eq!(comp.poll(&mut cx), Poll::Ready(()));
    }
}
