/*!
 * MCS Queue Lock with an Ownership Bit
 *
 * Contenders line up in an MCS queue and only the queue head competes for
 * the ownership bit (a [`CasLock`]). The queue node lives on the stack of
 * `lock()` and leaves the queue before `lock()` returns, so nothing is
 * carried from `lock()` to `unlock()` and the whole state stays inside the
 * mutex handle.
 *
 * `try_lock` only tries the ownership bit; it may barge ahead of queued
 * threads.
 */

use super::backoff::Backoff;
use super::caslock::CasLock;
use crate::sync::LockStrategy;
use std::hint::spin_loop;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

struct McsNode {
    next: AtomicPtr<McsNode>,
    waiting: AtomicBool,
}

impl McsNode {
    const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            waiting: AtomicBool::new(true),
        }
    }
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct McsLock {
    tail: AtomicPtr<McsNode>,
    owner: CasLock,
}

impl McsLock {
    pub const fn new() -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            owner: CasLock::new(),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.owner.is_locked()
    }

    /// Whether any thread is queued behind the owner
    #[inline]
    pub fn has_queue(&self) -> bool {
        !self.tail.load(Ordering::Relaxed).is_null()
    }

    fn enqueue(&self, node: &McsNode) {
        let me = node as *const McsNode as *mut McsNode;
        let prev = self.tail.swap(me, Ordering::AcqRel);
        if prev.is_null() {
            return;
        }

        // SAFETY: `prev` stays alive until it has handed the queue to us.
        unsafe { (*prev).next.store(me, Ordering::Release) };

        let backoff = Backoff::new();
        while node.waiting.load(Ordering::Acquire) {
            backoff.snooze();
        }
    }

    fn dequeue(&self, node: &McsNode) {
        let me = node as *const McsNode as *mut McsNode;
        let mut next = node.next.load(Ordering::Acquire);

        if next.is_null() {
            if self
                .tail
                .compare_exchange(me, ptr::null_mut(), Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            // A successor swapped the tail but has not linked itself yet.
            loop {
                next = node.next.load(Ordering::Acquire);
                if !next.is_null() {
                    break;
                }
                spin_loop();
            }
        }

        // SAFETY: the successor spins on its node until this store.
        unsafe { (*next).waiting.store(false, Ordering::Release) };
    }
}

// SAFETY: null tail and a zeroed CasLock are the unlocked state.
unsafe impl LockStrategy for McsLock {
    fn init(&self) {
        self.tail.store(ptr::null_mut(), Ordering::SeqCst);
        self.owner.init();
    }

    fn lock(&self) {
        if self.owner.try_lock() {
            return;
        }

        let node = McsNode::new();
        self.enqueue(&node);
        self.owner.lock();
        self.dequeue(&node);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.owner.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.owner.unlock();
    }

    fn name(&self) -> &'static str {
        "mcslock"
    }
}
