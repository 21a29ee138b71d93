// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::scheduler::park::Parker;
use crate::{AsyncComputation, BoxComputation, Context};
use std::task::Poll;

/// Drive `comp` to completion on the calling thread, blocking between polls.
///
/// Builds an auto-reset park handle, wraps it in a [`Context`] with no
/// scheduler attached, and alternates `poll` with parking until `comp`
/// returns `Ready`. Wakes from other threads, and spurious wakes, are both
/// tolerated.
///
/// # Panics
///
/// Propagates any panic raised by `comp`'s `poll`.
#[tracing::instrument(skip_all)]
pub fn run_sync<T>(mut comp: BoxComputation<T>) -> T {
    let parker = Parker::for_current();
    let waker = parker.clone().into_waker();

    loop {
        let mut cx = Context::from_waker(&waker);
        match comp.poll(&mut cx) {
            Poll::Ready(v) => return v,
            Poll::Pending => {
                tracing::trace!("run_sync: pending, parking");
                parker.park();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{map, merge, ready};
    use crate::computation::create;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn ready_completes_immediately() {
        assert_eq!(run_sync(ready(42)), 42);
    }

    #[test]
    fn map_completes() {
        assert_eq!(run_sync(map(|x: i32| x + 1, ready(41))), 42);
    }

    #[test]
    fn merge_completes() {
        assert_eq!(run_sync(merge(ready("a"), ready(1))), ("a", 1));
    }

    #[test]
    fn wake_from_other_thread_is_observed() {
        let ready_flag = Arc::new(AtomicBool::new(false));
        {
            let ready_flag = ready_flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                ready_flag.store(true, Ordering::SeqCst);
            });
        }

        let mut waker_sent = false;
        let comp: Box<dyn AsyncComputation<()> + Send> = Box::new(create(
            move |cx| {
                if ready_flag.load(Ordering::SeqCst) {
                    Poll::Ready(())
                } else {
                    if !waker_sent {
                        waker_sent = true;
                        let waker = cx.waker().clone();
                        std::thread::spawn(move || {
                            std::thread::sleep(Duration::from_millis(20));
                            waker.wake();
                        });
                    }
                    Poll::Pending
                }
            },
            || {},
        ));
        run_sync(comp);
    }
}
