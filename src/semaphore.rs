//! A hand-rolled blocking counting semaphore.
//!
//! The stack this crate otherwise draws on has no blocking, thread-oriented
//! counting semaphore with try/wait/post semantics (the async runtimes in
//! the wider corpus offer only cooperative, `.await`-based semaphores, which
//! do not fit a synchronous, OS-thread producer/consumer protocol). This is
//! the one primitive built from scratch, on top of `Mutex`+`Condvar`.

use std::sync::{Condvar, Mutex};

/// Number of spurious wakeups a blocking [`Semaphore::wait`] tolerates
/// before surfacing [`SemaphoreError::TimedOut`].
const MAX_SEM_WAIT_TRIES: u32 = 6;

/// Failure modes for a semaphore wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SemaphoreError {
    /// A non-blocking wait found no available token.
    WouldBlock,
    /// A blocking wait exhausted its spurious-wakeup retry budget.
    TimedOut,
}

/// A counting semaphore with blocking, non-blocking, and bounded-retry waits.
pub(crate) struct Semaphore {
    count: Mutex<u64>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn new(initial: u64) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Increments the count and wakes one waiter.
    pub(crate) fn post(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        self.available.notify_one();
    }

    /// Decrements the count immediately if positive, else returns `WouldBlock`.
    pub(crate) fn try_wait(&self) -> Result<(), SemaphoreError> {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        if *count > 0 {
            *count -= 1;
            Ok(())
        } else {
            Err(SemaphoreError::WouldBlock)
        }
    }

    /// Blocks until a token is available, tolerating up to
    /// [`MAX_SEM_WAIT_TRIES`] spurious wakeups before giving up.
    pub(crate) fn wait(&self) -> Result<(), SemaphoreError> {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        let mut tries = 0;
        while *count == 0 {
            if tries >= MAX_SEM_WAIT_TRIES {
                return Err(SemaphoreError::TimedOut);
            }
            count = self
                .available
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
            tries += 1;
        }
        *count -= 1;
        Ok(())
    }

    /// Current token count. Observational only, matching the source's
    /// `sem_getvalue` use in its best-effort state dump: not synchronized
    /// with the buffer's position indices.
    pub(crate) fn value(&self) -> u64 {
        *self.count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn try_wait_without_tokens_fails() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.try_wait(), Err(SemaphoreError::WouldBlock));
    }

    #[test]
    fn post_then_try_wait_succeeds() {
        let sem = Semaphore::new(0);
        sem.post();
        assert_eq!(sem.try_wait(), Ok(()));
        assert_eq!(sem.try_wait(), Err(SemaphoreError::WouldBlock));
    }

    #[test]
    fn blocking_wait_wakes_on_post() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = Arc::clone(&sem);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(20));
        sem.post();
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn value_reflects_pending_tokens() {
        let sem = Semaphore::new(0);
        sem.post();
        sem.post();
        assert_eq!(sem.value(), 2);
    }
}
