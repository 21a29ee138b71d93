// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::CancelledError;
use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

enum SeqIter<I, F> {
    Running {
        iter: I,
        body: F,
        current: Option<BoxComputation<()>>,
    },
    Cancelled,
    Done,
}

impl<I, F> AsyncComputation<()> for SeqIter<I, F>
where
    I: Iterator,
    F: FnMut(I::Item) -> BoxComputation<()>,
{
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self {
            SeqIter::Done => return Poll::Ready(()),
            SeqIter::Cancelled => panic!("{}", CancelledError::new()),
            SeqIter::Running { .. } => {}
        }
        let SeqIter::Running { iter, body, current } = self else {
            unreachable!()
        };
        loop {
            if current.is_none() {
                match iter.next() {
                    Some(item) => *current = Some(body(item)),
                    None => {
                        *self = SeqIter::Done;
                        return Poll::Ready(());
                    }
                }
            }
            let comp = current.as_mut().expect("just populated");
            match comp.poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(()) => *current = None,
            }
        }
    }

    fn cancel(&mut self) {
        if let SeqIter::Running { current, .. } = self {
            if let Some(comp) = current {
                comp.cancel();
            }
        }
        *self = SeqIter::Cancelled;
    }
}

/// Drives `body(x)` to `Ready(())` for each item of `seq` in sequence; on
/// each `Pending` returns `Pending` and resumes exactly where it left off on
/// re-poll.
///
/// Cancellation is sticky: once cancelled, every subsequent poll panics with
/// [`CancelledError`].
pub fn seq_iter<I, F>(seq: I, body: F) -> BoxComputation<()>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    F: FnMut(I::Item) -> BoxComputation<()> + Send + 'static,
{
    Box::new(SeqIter::Running {
        iter: seq.into_iter(),
        body,
        current: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::ready;
    use crate::run_sync;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_every_item_in_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let comp = {
            let seen = Arc::clone(&seen);
            seq_iter(vec![1, 2, 3], move |item| {
                seen.lock().unwrap().push(item);
                ready(())
            })
        };
        run_sync(comp);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_sequence_resolves_immediately() {
        let comp = seq_iter(Vec::<i32>::new(), |_: i32| ready(()));
        assert_eq!(run_sync(comp), ());
    }

    #[test]
    #[should_panic]
    fn repolling_after_cancel_panics() {
        let count = Arc::new(AtomicUsize::new(0));
        let waker = crate::test_support::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut comp = {
            let count = Arc::clone(&count);
            seq_iter(vec![1, 2], move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                ready(())
            })
        };
        comp.cancel();
        let _ = comp.poll(&mut cx);
    }
}
