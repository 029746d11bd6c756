/*!
 * Generation-Counter Condition Variable
 *
 * Condition variable emulation built from a single `AtomicU32`, laid out in
 * the storage of a `pthread_cond_t`.
 *
 * # Design: Busy-Wait Over a Waiter Queue
 *
 * Signal and broadcast both bump a generation counter; a waiter spins
 * (yielding the processor each round) until the counter differs from the
 * value it saw before releasing the mutex. There is no waiter list, no
 * allocation and no per-waiter bookkeeping. The price:
 *
 * - waiting burns CPU instead of blocking;
 * - signal and broadcast are indistinguishable, every waiter re-checks.
 *
 * A returned wait only means *some* increment happened. Callers loop on
 * their own predicate, exactly as with a native condition variable.
 *
 * Do not turn this into a blocking primitive: latency and CPU usage
 * characteristics are part of the contract.
 */

use super::deadline::Deadline;
use super::traits::Relock;
use crate::config::DeadlinePrecision;
use crate::errors::ShimError;
use libc::c_int;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Wait operation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("Wait operation timed out")]
    TimedOut,

    /// Releasing the external mutex failed with this pthread code; the
    /// caller still holds it and no wait took place
    #[error("Releasing the mutex failed with code {0}")]
    Unlock(c_int),

    /// Reacquiring the external mutex failed with this pthread code
    #[error("Reacquiring the mutex failed with code {0}")]
    Relock(c_int),
}

impl WaitError {
    /// pthread result code for this outcome
    pub fn code(&self) -> c_int {
        match self {
            WaitError::TimedOut => libc::ETIMEDOUT,
            WaitError::Unlock(code) | WaitError::Relock(code) => *code,
        }
    }
}

impl From<WaitError> for ShimError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::TimedOut => ShimError::TimedOut,
            WaitError::Unlock(code) => ShimError::UnlockFailed(code),
            WaitError::Relock(code) => ShimError::RelockFailed(code),
        }
    }
}

/// Condition state: one generation counter
#[repr(C)]
#[derive(Debug, Default)]
pub struct GenerationCond {
    generation: AtomicU32,
}

impl GenerationCond {
    pub const fn new() -> Self {
        Self {
            generation: AtomicU32::new(0),
        }
    }

    pub fn init(&self) {
        self.generation.store(0, Ordering::SeqCst);
    }

    /// No resources to release
    #[inline]
    pub fn destroy(&self) {}

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Wake every waiter; wraps around on overflow
    #[inline]
    pub fn signal(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Same as [`signal`](Self::signal)
    #[inline]
    pub fn broadcast(&self) {
        self.signal();
    }

    /// Release `mutex`, spin until signaled, reacquire `mutex`
    ///
    /// Never times out. If `mutex` cannot be released the call returns
    /// [`WaitError::Unlock`] at once instead of spinning.
    ///
    /// # Safety
    ///
    /// The calling thread must hold `mutex`.
    pub unsafe fn wait<M: Relock + ?Sized>(&self, mutex: &M) -> WaitResult<()> {
        let seen = self.generation.load(Ordering::Relaxed);
        release(mutex)?;

        // signal and broadcast both end this loop
        while self.generation.load(Ordering::Acquire) == seen {
            thread::yield_now();
        }

        relock(mutex)
    }

    /// Like [`wait`](Self::wait), but gives up once `deadline` has passed
    ///
    /// The mutex is held again when this returns, whatever the outcome.
    ///
    /// # Safety
    ///
    /// The calling thread must hold `mutex`.
    pub unsafe fn wait_until<M: Relock + ?Sized>(
        &self,
        mutex: &M,
        deadline: &Deadline,
        precision: DeadlinePrecision,
    ) -> WaitResult<()> {
        let seen = self.generation.load(Ordering::Relaxed);
        release(mutex)?;

        while self.generation.load(Ordering::Acquire) == seen {
            thread::yield_now();

            if deadline.is_expired(precision) {
                relock(mutex)?;
                return Err(WaitError::TimedOut);
            }
        }

        relock(mutex)
    }
}

#[inline]
unsafe fn release<M: Relock + ?Sized>(mutex: &M) -> WaitResult<()> {
    match mutex.unlock() {
        0 => Ok(()),
        code => Err(WaitError::Unlock(code)),
    }
}

#[inline]
fn relock<M: Relock + ?Sized>(mutex: &M) -> WaitResult<()> {
    match mutex.lock() {
        0 => Ok(()),
        code => Err(WaitError::Relock(code)),
    }
}
