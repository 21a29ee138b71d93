// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;

/// Raised when a cancelled [`AsyncComputation`](crate::AsyncComputation) is
/// polled through a [`CancellationFuse`](crate::combinators::CancellationFuse)
/// or an [`OnceVar`](crate::OnceVar).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CancelledError(());

impl CancelledError {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}

impl fmt::Display for CancelledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("computation was cancelled")
    }
}

impl std::error::Error for CancelledError {}

/// Raised by [`OnceVar::write`](crate::OnceVar::write) when the cell already
/// holds a value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OnceVarDoubleWriteError(());

impl OnceVarDoubleWriteError {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}

impl fmt::Display for OnceVarDoubleWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("OnceVar already has a value")
    }
}

impl std::error::Error for OnceVarDoubleWriteError {}

/// A panic payload latched by `merge`/`first`/`apply` so that it can be
/// re-raised on every subsequent poll.
///
/// `Box<dyn Any + Send>` (the payload type `std::panic::catch_unwind`
/// produces) is not `Clone`, so the original object can only be resumed
/// once. This crate instead extracts a displayable message from the payload
/// (via downcast to `&str`/`String`, falling back to a generic message) and
/// re-panics with a fresh `String` carrying that message on every
/// subsequent poll. The re-raised panic is message-equivalent, not
/// object-identical, to the original.
#[derive(Clone, Debug)]
pub struct LatchedPanic {
    message: String,
}

impl LatchedPanic {
    pub(crate) fn capture(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "a sibling computation panicked".to_string()
        };
        Self { message }
    }

    pub(crate) fn resume(&self) -> ! {
        std::panic::resume_unwind(Box::new(self.message.clone()));
    }

    /// The captured panic message. Not identical to the original payload
    /// (which cannot be cloned), but equivalent.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LatchedPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.message)
    }
}

impl std::error::Error for LatchedPanic {}
