/*!
 * CAS Spinlock
 *
 * One word, 0 = free, 1 = held. Test-and-test-and-set with backoff; not
 * fair, starvation is possible under heavy contention.
 */

use super::backoff::Backoff;
use crate::sync::LockStrategy;
use std::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

#[repr(C)]
#[derive(Debug, Default)]
pub struct CasLock {
    state: AtomicU32,
}

impl CasLock {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) == LOCKED
    }

    #[inline(always)]
    fn try_acquire(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

// SAFETY: zero is UNLOCKED, the state is a single atomic word.
unsafe impl LockStrategy for CasLock {
    fn init(&self) {
        self.state.store(UNLOCKED, Ordering::SeqCst);
    }

    fn lock(&self) {
        let backoff = Backoff::new();
        loop {
            if self.try_acquire() {
                return;
            }
            // Wait on a plain load so contenders don't bounce the line with CAS.
            while self.is_locked() {
                backoff.snooze();
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "caslock"
    }
}
