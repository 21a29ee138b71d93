// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Shared helpers for `#[cfg(test)]` modules throughout this crate.

use std::sync::Arc;
use std::task::{Wake, Waker};

struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
}

/// A `Waker` that does nothing when woken, for tests that only need to
/// drive a single `poll` call without actually parking.
pub(crate) fn noop_waker() -> Waker {
    Waker::from(Arc::new(NoopWaker))
}
