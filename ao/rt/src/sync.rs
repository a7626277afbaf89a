//! Synchronization primitives for the mailbox.

use std::sync::{Condvar, Mutex};

/// Counting semaphore built on `Mutex` + `Condvar`.
///
/// The mailbox uses it to signal envelope availability: producers `post`
/// after enqueueing, the worker `wait`s before dequeueing. This is the
/// runtime's only OS touchpoint besides the thread itself.
pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Semaphore with an initial count of zero.
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    /// Increment the count and wake one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        *count += 1;
        drop(count);
        self.available.notify_one();
    }

    /// Block until the count is positive, then decrement it.
    pub fn wait(&self) {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        while *count == 0 {
            count = self
                .available
                .wait(count)
                .expect("semaphore mutex poisoned");
        }
        *count -= 1;
    }

    /// Decrement the count without blocking; `false` when it was zero.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}
