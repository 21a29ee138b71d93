// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::{CancelledError, OnceVarDoubleWriteError};
use crate::{AsyncComputation, Context};
use std::fmt;
use std::sync::Mutex;
use std::task::{Poll, Waker};

enum State<T> {
    Empty,
    Waiting(Waker),
    HasValue(T),
    Cancelled,
    CancelledWithValue(T),
}

/// A single-assignment, thread-safe, asynchronous cell.
///
/// `OnceVar` is the minimal rendezvous primitive this crate's sync
/// primitives (`Notify`, `Mutex`, `RwLock`, `Semaphore`, `Barrier`) are
/// built over. It has five logical states — `Empty`, `Waiting`, `HasValue`,
/// `Cancelled`, `CancelledWithValue` — governed by a single short-hold
/// lock. At most one value may ever be written, and at most one waiter is
/// tracked at a time (the cell is single-consumer by construction: a second
/// poller simply displaces the first as the registered waiter).
pub struct OnceVar<T> {
    state: Mutex<State<T>>,
}

impl<T: Clone> OnceVar<T> {
    /// An empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Empty),
        }
    }

    /// Places `v` in the cell if it is `Empty`, `Waiting`, or `Cancelled`.
    ///
    /// Returns `false` without touching `v` (it is dropped) if the cell
    /// already holds a value (`HasValue` or `CancelledWithValue`). If a
    /// waiter was registered, it is woken after the lock is released.
    pub fn try_write(&self, v: T) -> bool {
        let woken = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &*state {
                State::HasValue(_) | State::CancelledWithValue(_) => return false,
                State::Empty => {
                    *state = State::HasValue(v);
                    None
                }
                State::Waiting(_) => {
                    let State::Waiting(waker) = std::mem::replace(&mut *state, State::HasValue(v))
                    else {
                        unreachable!()
                    };
                    Some(waker)
                }
                State::Cancelled => {
                    *state = State::CancelledWithValue(v);
                    None
                }
            }
        };
        if let Some(waker) = woken {
            waker.wake();
        }
        true
    }

    /// Like [`try_write`](Self::try_write), but returns
    /// [`OnceVarDoubleWriteError`] instead of `false` on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell already holds a value.
    pub fn write(&self, v: T) -> Result<(), OnceVarDoubleWriteError> {
        if self.try_write(v) {
            Ok(())
        } else {
            Err(OnceVarDoubleWriteError::new())
        }
    }

    /// A non-blocking peek: `Some(v)` if the cell carries a value (written
    /// or cancelled-with-value), `None` otherwise.
    #[must_use]
    pub fn try_read(&self) -> Option<T> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            State::HasValue(v) | State::CancelledWithValue(v) => Some(v.clone()),
            State::Empty | State::Waiting(_) | State::Cancelled => None,
        }
    }

    /// Transitions `Empty`/`Waiting` to `Cancelled`, `HasValue` to
    /// `CancelledWithValue`. Idempotent: cancelling an already-cancelled
    /// cell is a no-op.
    pub fn cancel(&self) {
        let woken = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *state, State::Cancelled) {
                State::Empty | State::Cancelled => None,
                State::Waiting(waker) => Some(waker),
                State::HasValue(v) => {
                    *state = State::CancelledWithValue(v);
                    None
                }
                s @ State::CancelledWithValue(_) => {
                    *state = s;
                    None
                }
            }
        };
        if let Some(waker) = woken {
            waker.wake();
        }
    }

    /// Poll this cell through a shared reference.
    ///
    /// The [`AsyncComputation`] impl below requires `&mut self` only to
    /// satisfy the trait; all state lives behind the internal lock, so
    /// callers that only have `&OnceVar<T>` (e.g. a `JoinHandle` holding an
    /// `Arc<OnceVar<T>>`) can poll through this method directly.
    pub(crate) fn poll_shared(&self, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            State::HasValue(v) | State::CancelledWithValue(v) => Poll::Ready(v.clone()),
            State::Cancelled => panic!("{}", CancelledError::new()),
            State::Empty | State::Waiting(_) => {
                *state = State::Waiting(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T: Clone> Default for OnceVar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> AsyncComputation<T> for OnceVar<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        self.poll_shared(cx)
    }

    fn cancel(&mut self) {
        OnceVar::cancel(self);
    }
}

impl<T> fmt::Debug for OnceVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let tag = match &*state {
            State::Empty => "Empty",
            State::Waiting(_) => "Waiting",
            State::HasValue(_) => "HasValue",
            State::Cancelled => "Cancelled",
            State::CancelledWithValue(_) => "CancelledWithValue",
        };
        f.debug_struct("OnceVar").field("state", &tag).finish()
    }
}
