/*!
 * Exported Symbol Tests
 *
 * This binary takes over the pthread primitives itself, so every
 * `libc::pthread_*` call below goes through the generated symbols. Rust's
 * own `std::sync` does not use pthread mutexes on Linux and keeps working
 * while interception is on.
 */

#![cfg(target_os = "linux")]

mod common;

use common::{Cond, Guarded, Mutex};
use lockshim::interpose::{mechanism, Mechanism, NextSymbol};
use lockshim::strategies::CasLock;
use lockshim::sync::storage;
use lockshim::{runtime, LockStrategy};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

static ACQUIRED: AtomicUsize = AtomicUsize::new(0);

/// `CasLock` that counts successful acquisitions
#[repr(C)]
#[derive(Default)]
struct CountingLock {
    inner: CasLock,
}

unsafe impl LockStrategy for CountingLock {
    fn init(&self) {
        self.inner.init();
    }

    fn lock(&self) {
        self.inner.lock();
        ACQUIRED.fetch_add(1, Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        let acquired = self.inner.try_lock();
        if acquired {
            ACQUIRED.fetch_add(1, Ordering::Relaxed);
        }
        acquired
    }

    unsafe fn unlock(&self) {
        self.inner.unlock();
    }
}

lockshim::interpose!(CountingLock);

/// Interception on for the guard's lifetime
struct Intercepting;

impl Intercepting {
    fn start() -> Self {
        runtime().enable();
        Intercepting
    }
}

impl Drop for Intercepting {
    fn drop(&mut self) {
        runtime().disable();
    }
}

#[test]
fn test_elf_targets_use_next_symbol() {
    assert_eq!(mechanism(), Mechanism::DynamicNext);
}

#[test]
#[serial]
fn test_trylock_twice_through_symbols() {
    let mutex = Mutex::zeroed();
    let m = mutex.as_ptr();
    let _on = Intercepting::start();
    let before = ACQUIRED.load(Ordering::Relaxed);

    unsafe {
        assert_eq!(libc::pthread_mutex_init(m, ptr::null()), 0);
        assert_eq!(libc::pthread_mutex_trylock(m), 0);
        assert_eq!(libc::pthread_mutex_trylock(m), libc::EBUSY);
        assert_eq!(libc::pthread_mutex_unlock(m), 0);
        assert_eq!(libc::pthread_mutex_lock(m), 0);
        assert_eq!(libc::pthread_mutex_unlock(m), 0);
        assert_eq!(libc::pthread_mutex_destroy(m), 0);
    }

    assert_eq!(ACQUIRED.load(Ordering::Relaxed) - before, 2);
}

#[test]
#[serial]
fn test_disabled_symbols_reach_the_c_library() {
    runtime().disable();
    let mutex = Mutex::zeroed();
    let m = mutex.as_ptr();
    let before = ACQUIRED.load(Ordering::Relaxed);

    unsafe {
        assert_eq!(libc::pthread_mutex_init(m, ptr::null()), 0);
        assert_eq!(libc::pthread_mutex_lock(m), 0);
        assert_eq!(libc::pthread_mutex_trylock(m), libc::EBUSY);
        assert_eq!(libc::pthread_mutex_unlock(m), 0);
        assert_eq!(libc::pthread_mutex_destroy(m), 0);
    }

    assert_eq!(ACQUIRED.load(Ordering::Relaxed), before);
    assert!(NextSymbol::resolved().contains(&c"pthread_mutex_lock"));
}

#[test]
#[serial]
fn test_mutual_exclusion_through_symbols() {
    const THREADS: usize = 3;
    let mutex = Arc::new(Mutex::zeroed());
    let count = Arc::new(Guarded::new(0usize));
    let _on = Intercepting::start();

    unsafe { libc::pthread_mutex_init(mutex.as_ptr(), ptr::null()) };

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let (mutex, count) = (mutex.clone(), count.clone());
            thread::spawn(move || unsafe {
                libc::pthread_mutex_lock(mutex.as_ptr());
                *count.get() += 1;
                libc::pthread_mutex_unlock(mutex.as_ptr());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(unsafe { *count.get() }, THREADS);
    assert!(!unsafe { storage::mutex_state::<CountingLock>(mutex.as_ptr()) }
        .inner
        .is_locked());
}

#[test]
#[serial]
fn test_condition_rendezvous_through_symbols() {
    const N: usize = 3;
    let mutex = Arc::new(Mutex::zeroed());
    let cond = Arc::new(Cond::zeroed());
    let arrived = Arc::new(Guarded::new(0usize));
    let _on = Intercepting::start();

    unsafe {
        libc::pthread_mutex_init(mutex.as_ptr(), ptr::null());
        libc::pthread_cond_init(cond.as_ptr(), ptr::null());
    }

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let (mutex, cond, arrived) = (mutex.clone(), cond.clone(), arrived.clone());
            thread::spawn(move || unsafe {
                let (m, c) = (mutex.as_ptr(), cond.as_ptr());
                libc::pthread_mutex_lock(m);
                *arrived.get() += 1;
                libc::pthread_cond_broadcast(c);
                while *arrived.get() < N {
                    libc::pthread_cond_wait(c, m);
                }
                libc::pthread_mutex_unlock(m);
                libc::pthread_cond_signal(c);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(unsafe { *arrived.get() }, N);
    // every thread broadcast once and signaled once
    assert_eq!(unsafe { storage::cond_state(cond.as_ptr()) }.generation(), 2 * N as u32);
}

#[test]
#[serial]
fn test_timed_wait_through_symbols() {
    let mutex = Mutex::zeroed();
    let cond = Cond::zeroed();
    let (m, c) = (mutex.as_ptr(), cond.as_ptr());
    let _on = Intercepting::start();
    let abstime = lockshim::sync::Deadline::after(Duration::from_millis(50)).as_timespec();

    unsafe {
        libc::pthread_mutex_init(m, ptr::null());
        libc::pthread_cond_init(c, ptr::null());
        libc::pthread_mutex_lock(m);

        let start = Instant::now();
        assert_eq!(libc::pthread_cond_timedwait(c, m, &abstime), libc::ETIMEDOUT);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(libc::pthread_mutex_trylock(m), libc::EBUSY);

        libc::pthread_mutex_unlock(m);
    }
}
