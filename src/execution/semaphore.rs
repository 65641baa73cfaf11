use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Blocking counting semaphore bounding the number of chunks validated at once.
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    /// `permits` must be non-zero; the engine checks this when it is built.
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Take a permit, blocking until one is free. Returns the time spent blocked.
    pub(crate) fn acquire(&self) -> Permit<'_> {
        let start = Instant::now();
        let mut waited = false;
        // The counter stays consistent even if a holder panicked, so poisoning is ignored.
        let mut free = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        while *free == 0 {
            waited = true;
            free = self.cv.wait(free).unwrap_or_else(PoisonError::into_inner);
        }
        *free -= 1;
        Permit {
            sem: self,
            waited: if waited { start.elapsed() } else { Duration::ZERO },
        }
    }

    fn release(&self) {
        let mut free = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        *free += 1;
        self.cv.notify_one();
    }
}

/// Held permit; released on drop.
pub(crate) struct Permit<'a> {
    sem: &'a Semaphore,
    pub(crate) waited: Duration,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
