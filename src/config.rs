// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::time::{Clock, SystemClock};
use std::fmt;
use std::sync::Arc;

/// Builder-style configuration for a [`LocalScheduler`](crate::LocalScheduler):
/// consuming `with_*` methods that each return `Self`, applied at
/// construction time.
pub struct Config {
    queue_capacity_hint: usize,
    clock: Arc<dyn Clock>,
}

impl Config {
    /// The default configuration: no queue capacity hint, and the host's
    /// system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue_capacity_hint: 0,
            clock: Arc::new(SystemClock),
        }
    }

    /// Hint the initial capacity to reserve for a scheduler's run queue.
    ///
    /// By default, no capacity is reserved up front.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity_hint = capacity;
        self
    }

    /// Override the clock used by time-based computations (`sleep`,
    /// `sleep_until`) constructed through this configuration.
    ///
    /// By default, [`SystemClock`] is used.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured queue capacity hint.
    #[must_use]
    pub fn queue_capacity_hint(&self) -> usize {
        self.queue_capacity_hint
    }

    /// The configured clock.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("queue_capacity_hint", &self.queue_capacity_hint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reasonable() {
        let config = Config::new();
        assert_eq!(config.queue_capacity_hint(), 0);
    }

    #[test]
    fn builder_methods_compose() {
        let config = Config::new().with_queue_capacity(16);
        assert_eq!(config.queue_capacity_hint(), 16);
    }
}
