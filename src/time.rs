// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A pluggable time source, plus `sleep`/`sleep_until` built over an
//! external one-shot timer thread.
//!
//! There's no timer wheel here: each `sleep` spawns one thread that parks
//! for the requested duration and then wakes the stored waker, which is
//! adequate for a cooperative library with no I/O reactor of its own.
//! Production users driving many concurrent sleeps on a real scheduler are
//! expected to supply their own `Clock`/timer integration at a higher layer.

use crate::{AsyncComputation, BoxComputation, Context};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Poll, Waker};
use std::time::{Duration, Instant};

/// A source of monotonic time, abstracted so tests can inject a fake clock.
pub trait Clock: Send + Sync {
    /// The current instant, per this clock.
    fn now(&self) -> Instant;
}

/// The default [`Clock`]: a thin wrapper over [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A computation that resolves once `duration` has elapsed, measured from
/// the first poll.
#[must_use]
pub fn sleep(duration: Duration) -> BoxComputation<()> {
    sleep_with_clock(duration, Arc::new(SystemClock))
}

/// Like [`sleep`], but measuring elapsed time against a caller-supplied
/// [`Clock`] rather than the host's wall clock.
pub fn sleep_with_clock(duration: Duration, clock: Arc<dyn Clock>) -> BoxComputation<()> {
    Box::new(Sleep {
        duration,
        clock,
        state: SleepState::NotStarted,
    })
}

/// A computation that resolves once `clock.now() >= deadline`.
#[must_use]
pub fn sleep_until(deadline: Instant) -> BoxComputation<()> {
    let now = Instant::now();
    sleep(deadline.saturating_duration_since(now))
}

enum SleepState {
    NotStarted,
    Waiting(Arc<Timer>),
    Done,
}

struct Timer {
    fired: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

struct Sleep {
    duration: Duration,
    clock: Arc<dyn Clock>,
    state: SleepState,
}

impl AsyncComputation<()> for Sleep {
    #[tracing::instrument(skip(self, cx), fields(duration = ?self.duration))]
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match &self.state {
            SleepState::Done => return Poll::Ready(()),
            SleepState::NotStarted => {
                let timer = Arc::new(Timer {
                    fired: AtomicBool::new(false),
                    waker: Mutex::new(Some(cx.waker().clone())),
                });
                let deadline = self.clock.now() + self.duration;
                let clock = self.clock.clone();
                let background = timer.clone();
                std::thread::spawn(move || {
                    loop {
                        let remaining = deadline.saturating_duration_since(clock.now());
                        if remaining.is_zero() {
                            break;
                        }
                        std::thread::sleep(remaining);
                    }
                    background.fired.store(true, Ordering::Release);
                    if let Some(waker) =
                        background.waker.lock().unwrap_or_else(|e| e.into_inner()).take()
                    {
                        tracing::trace!("sleep timer fired");
                        waker.wake();
                    }
                });
                self.state = SleepState::Waiting(timer);
            }
            SleepState::Waiting(timer) => {
                *timer.waker.lock().unwrap_or_else(|e| e.into_inner()) = Some(cx.waker().clone());
            }
        }

        if let SleepState::Waiting(timer) = &self.state {
            if timer.fired.load(Ordering::Acquire) {
                self.state = SleepState::Done;
                return Poll::Ready(());
            }
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        // The background thread still runs to completion (there is no
        // portable way to abort a parked `std::thread::sleep`), but it
        // finds no waker to call: dropping the `Waker` here, rather than
        // leaving a stale clone in `timer.waker`, prevents a late wake
        // from resurrecting an already-cancelled computation.
        if let SleepState::Waiting(timer) = &self.state {
            *timer.waker.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }
        self.state = SleepState::Done;
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep").field("duration", &self.duration).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_sync;

    struct FakeClock {
        now: Mutex<Instant>,
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn sleep_zero_completes() {
        run_sync(sleep(Duration::from_millis(0)));
    }

    #[test]
    fn sleep_completes_after_duration() {
        let start = Instant::now();
        run_sync(sleep(Duration::from_millis(15)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn fake_clock_is_honored() {
        let clock = Arc::new(FakeClock {
            now: Mutex::new(Instant::now()),
        });
        // A zero duration against a fake clock should resolve without
        // waiting on the real wall clock's actual elapsed time.
        run_sync(sleep_with_clock(Duration::from_millis(0), clock));
    }
}
