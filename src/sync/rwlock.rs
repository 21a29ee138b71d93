// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::waitqueue::{Waiter, WaitQueue};
use crate::{AsyncComputation, BoxComputation, Context};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;

/// An asynchronous reader/writer lock with writer priority: once a writer
/// is waiting, new readers queue behind it rather than continuing to join
/// in ahead of it, so a steady stream of readers cannot starve a writer.
///
/// `state` encodes `-1` for write-locked, `0` for unlocked, and `n > 0` for
/// `n` active readers.
pub struct RwLock<T: ?Sized> {
    state: AtomicIsize,
    writers_waiting: AtomicUsize,
    waiters: WaitQueue,
    data: UnsafeCell<T>,
}

// Safety: `data` is only reachable through a guard, and `state` enforces
// the usual shared-xor-exclusive discipline.
unsafe impl<T: ?Sized + Send> Send for RwLock<T> {}
// Safety: same reasoning as the `Send` impl above; `T: Sync` is additionally
// required since readers hand out concurrent `&T`s.
unsafe impl<T: ?Sized + Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    /// An unlocked lock wrapping `value`.
    pub fn new(value: T) -> Self {
        Self {
            state: AtomicIsize::new(0),
            writers_waiting: AtomicUsize::new(0),
            waiters: WaitQueue::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Non-blocking: acquires a read lock if no writer holds or is waiting
    /// for the lock.
    pub fn try_read(self: &Arc<Self>) -> Option<RwLockReadGuard<T>> {
        if self.writers_waiting.load(Ordering::Acquire) > 0 {
            return None;
        }
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current < 0 {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Some(RwLockReadGuard {
                        lock: self.clone(),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Non-blocking: acquires the write lock if it's completely free.
    pub fn try_write(self: &Arc<Self>) -> Option<RwLockWriteGuard<T>> {
        self.state
            .compare_exchange(0, -1, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RwLockWriteGuard {
                lock: self.clone(),
            })
    }

    /// A computation that resolves to a [`RwLockReadGuard`] once a read
    /// lock can be acquired.
    pub fn read(self: &Arc<Self>) -> BoxComputation<RwLockReadGuard<T>> {
        Box::new(ReadFuture {
            lock: self.clone(),
            waiter: None,
            done: false,
        })
    }

    /// A computation that resolves to a [`RwLockWriteGuard`] once the
    /// write lock can be acquired.
    pub fn write(self: &Arc<Self>) -> BoxComputation<RwLockWriteGuard<T>> {
        self.writers_waiting.fetch_add(1, Ordering::AcqRel);
        Box::new(WriteFuture {
            lock: self.clone(),
            waiter: None,
            done: false,
            counted: true,
        })
    }

    fn release_read(&self) {
        let prev = self.state.fetch_sub(1, Ordering::Release);
        if prev == 1 {
            self.waiters.wake_all();
        }
    }

    fn release_write(&self) {
        self.state.store(0, Ordering::Release);
        self.waiters.wake_all();
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RwLock");
        match self.state.load(Ordering::Acquire) {
            s if s < 0 => {
                d.field("data", &"<write-locked>");
            }
            0 => {
                // Safety: state is 0, so no guard holds a reference.
                d.field("data", unsafe { &*self.data.get() });
            }
            _ => {
                d.field("data", &"<read-locked>");
            }
        }
        d.finish()
    }
}

struct ReadFuture<T> {
    lock: Arc<RwLock<T>>,
    waiter: Option<Waiter>,
    done: bool,
}

impl<T> ReadFuture<T> {
    fn try_acquire(&mut self) -> Option<RwLockReadGuard<T>> {
        let guard = self.lock.try_read()?;
        if let Some(w) = self.waiter.take() {
            self.lock.waiters.remove(&w);
        }
        self.done = true;
        Some(guard)
    }
}

impl<T> AsyncComputation<RwLockReadGuard<T>> for ReadFuture<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<RwLockReadGuard<T>> {
        assert!(
            !self.done,
            "read() future polled again after yielding its guard"
        );
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.lock.waiters.push_back(cx.waker())),
        }
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.lock.waiters.remove(&w);
        }
        self.done = true;
    }
}

struct WriteFuture<T> {
    lock: Arc<RwLock<T>>,
    waiter: Option<Waiter>,
    done: bool,
    counted: bool,
}

impl<T> WriteFuture<T> {
    fn try_acquire(&mut self) -> Option<RwLockWriteGuard<T>> {
        let guard = self.lock.try_write()?;
        if let Some(w) = self.waiter.take() {
            self.lock.waiters.remove(&w);
        }
        self.finish();
        Some(guard)
    }

    fn finish(&mut self) {
        if self.counted {
            self.lock.writers_waiting.fetch_sub(1, Ordering::AcqRel);
            self.counted = false;
        }
        self.done = true;
    }
}

impl<T> AsyncComputation<RwLockWriteGuard<T>> for WriteFuture<T> {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<RwLockWriteGuard<T>> {
        assert!(
            !self.done,
            "write() future polled again after yielding its guard"
        );
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        match &self.waiter {
            Some(w) => w.update(cx.waker()),
            None => self.waiter = Some(self.lock.waiters.push_back(cx.waker())),
        }
        if let Some(guard) = self.try_acquire() {
            return Poll::Ready(guard);
        }
        Poll::Pending
    }

    fn cancel(&mut self) {
        if let Some(w) = self.waiter.take() {
            self.lock.waiters.remove(&w);
        }
        self.finish();
    }
}

/// An RAII shared-read guard.
pub struct RwLockReadGuard<T: ?Sized> {
    lock: Arc<RwLock<T>>,
}

impl<T: ?Sized> Deref for RwLockReadGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        // Safety: holding this guard proves a reader slot is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockReadGuard<T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// An RAII exclusive-write guard.
pub struct RwLockWriteGuard<T: ?Sized> {
    lock: Arc<RwLock<T>>,
}

impl<T: ?Sized> Deref for RwLockWriteGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        // Safety: holding this guard proves exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: holding this guard proves exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockWriteGuard<T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_readers_allowed() {
        let lock = Arc::new(RwLock::new(5));
        let r1 = lock.try_read().unwrap();
        let r2 = lock.try_read().unwrap();
        assert_eq!(*r1, 5);
        assert_eq!(*r2, 5);
        assert!(lock.try_write().is_none());
    }

    #[test]
    fn writer_excludes_everyone() {
        let lock = Arc::new(RwLock::new(0));
        let w = lock.try_write().unwrap();
        assert!(lock.try_read().is_none());
        assert!(lock.try_write().is_none());
        drop(w);
        assert!(lock.try_read().is_some());
    }

    #[test]
    fn waiting_writer_blocks_new_readers() {
        let lock = Arc::new(RwLock::new(0));
        let r = lock.try_read().unwrap();

        let waiting_lock = lock.clone();
        let write_started = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = write_started.clone();
        let handle = std::thread::spawn(move || {
            flag.store(true, Ordering::SeqCst);
            let _w = crate::run_sync(waiting_lock.write());
        });

        while !write_started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        std::thread::sleep(std::time::Duration::from_millis(10));

        // A writer is now waiting; new readers must queue behind it.
        assert!(lock.try_read().is_none());

        drop(r);
        handle.join().unwrap();
    }
}
