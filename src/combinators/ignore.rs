// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

struct Ignore<T> {
    source: BoxComputation<T>,
    done: bool,
}

impl<T> AsyncComputation<()> for Ignore<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        match self.source.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(_) => {
                self.done = true;
                Poll::Ready(())
            }
        }
    }

    fn cancel(&mut self) {
        if !self.done {
            self.source.cancel();
        }
    }
}

/// Drives `source` to completion, discarding its value.
pub fn ignore<T>(source: BoxComputation<T>) -> BoxComputation<()>
where
    T: Send + 'static,
{
    Box::new(Ignore {
        source,
        done: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;

    #[test]
    fn discards_the_source_value() {
        assert_eq!(run_sync(ignore(ready(42))), ());
    }

    #[test]
    fn repolling_after_ready_is_idempotent() {
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = ignore(ready("whatever"));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(()));
        assert_eq!(comp.poll(&mut cx), Poll::Ready(()));
    }
}
