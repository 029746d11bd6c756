/*!
 * Exponential Backoff
 *
 * Two-phase backoff for the strategies' spin loops:
 *
 * 1. **Spin phase**: `spin_loop()` hints, doubling each round
 * 2. **Yield phase**: `yield_now()` once spinning stops paying off
 */

use std::cell::Cell;
use std::hint::spin_loop;
use std::thread;

/// Rounds spent in the spin phase (the last one spins `1 << SPIN_LIMIT` times)
const SPIN_LIMIT: u32 = 6;

/// Step at which the counter stops growing
const YIELD_LIMIT: u32 = 10;

/// Per-acquisition backoff state, kept on the waiting thread's stack
#[derive(Debug, Default)]
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    #[inline]
    pub const fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Back off once
    #[inline]
    pub fn snooze(&self) {
        let step = self.step.get();
        if step <= SPIN_LIMIT {
            for _ in 0..1u32 << step {
                spin_loop();
            }
        } else {
            thread::yield_now();
        }

        if step <= YIELD_LIMIT {
            self.step.set(step + 1);
        }
    }

    /// Whether backoff has escalated to yielding the processor
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step.get() > SPIN_LIMIT
    }

    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }
}
