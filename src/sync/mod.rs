// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Asynchronous synchronization primitives built over [`crate::waitqueue`].
//!
//! Every primitive here follows the same register-then-recheck discipline:
//! attempt a non-blocking acquire, and only if that fails, register a waiter
//! and attempt the acquire once more before yielding `Pending`. This closes
//! (without a loom-verified proof) the race window between a failed
//! non-blocking attempt and waiter registration.

mod barrier;
mod mutex;
mod notify;
mod rwlock;
mod semaphore;

pub use barrier::{Barrier, BarrierWaitResult};
pub use mutex::{Mutex, MutexGuard};
pub use notify::Notify;
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use semaphore::{Semaphore, SemaphorePermit};
