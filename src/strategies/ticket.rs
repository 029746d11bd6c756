/*!
 * Ticket Lock
 *
 * FIFO-fair: each contender draws a ticket and waits until it is served.
 * Both counters wrap; only the owner advances `serving`.
 */

use super::backoff::Backoff;
use crate::sync::LockStrategy;
use std::sync::atomic::{AtomicU32, Ordering};

#[repr(C)]
#[derive(Debug, Default)]
pub struct TicketLock {
    next: AtomicU32,
    serving: AtomicU32,
}

impl TicketLock {
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
            serving: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.next.load(Ordering::Relaxed) != self.serving.load(Ordering::Relaxed)
    }

    /// Threads holding or waiting for the lock
    #[inline]
    pub fn queue_len(&self) -> u32 {
        self.next
            .load(Ordering::Relaxed)
            .wrapping_sub(self.serving.load(Ordering::Relaxed))
    }
}

// SAFETY: zeroed counters are equal, i.e. unlocked.
unsafe impl LockStrategy for TicketLock {
    fn init(&self) {
        self.next.store(0, Ordering::SeqCst);
        self.serving.store(0, Ordering::SeqCst);
    }

    fn lock(&self) {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        let backoff = Backoff::new();
        while self.serving.load(Ordering::Acquire) != ticket {
            backoff.snooze();
        }
    }

    fn try_lock(&self) -> bool {
        // Only take a ticket if it would be served immediately.
        let serving = self.serving.load(Ordering::Relaxed);
        self.next
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    unsafe fn unlock(&self) {
        let served = self.serving.load(Ordering::Relaxed);
        self.serving.store(served.wrapping_add(1), Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticketlock"
    }
}
