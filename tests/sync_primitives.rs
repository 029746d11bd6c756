/*!
 * Synchronization Primitives Integration Tests
 *
 * Strategies and the generation condvar used directly, without the
 * interception switch
 */

use lockshim::strategies::{CasLock, McsLock, TicketLock};
use lockshim::sync::{Deadline, GenerationCond, StrategyRelock, WaitError};
use lockshim::{DeadlinePrecision, LockStrategy};
use pretty_assertions::assert_eq;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Protected<S> {
    lock: S,
    count: UnsafeCell<usize>,
}

unsafe impl<S: LockStrategy> Sync for Protected<S> {}

fn hammer<S: LockStrategy + Default + Send + 'static>(threads: usize, rounds: usize) -> usize {
    let shared = Arc::new(Protected {
        lock: S::default(),
        count: UnsafeCell::new(0),
    });
    shared.lock.init();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..rounds {
                    shared.lock.lock();
                    unsafe {
                        *shared.count.get() += 1;
                        shared.lock.unlock();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    shared.lock.destroy();
    unsafe { *shared.count.get() }
}

#[test]
fn test_caslock_mutual_exclusion() {
    assert_eq!(hammer::<CasLock>(3, 1), 3);
    assert_eq!(hammer::<CasLock>(8, 2_000), 16_000);
}

#[test]
fn test_ticketlock_mutual_exclusion() {
    assert_eq!(hammer::<TicketLock>(3, 1), 3);
    assert_eq!(hammer::<TicketLock>(8, 2_000), 16_000);
}

#[test]
fn test_mcslock_mutual_exclusion() {
    assert_eq!(hammer::<McsLock>(3, 1), 3);
    assert_eq!(hammer::<McsLock>(8, 2_000), 16_000);
}

#[test]
fn test_trylock_on_fresh_state() {
    fn check<S: LockStrategy + Default>() {
        let lock = S::default();
        lock.init();

        assert!(lock.try_lock(), "{} first try_lock", lock.name());
        assert!(!lock.try_lock(), "{} second try_lock", lock.name());
        unsafe { lock.unlock() };

        lock.lock();
        unsafe { lock.unlock() };
    }

    check::<CasLock>();
    check::<TicketLock>();
    check::<McsLock>();
}

#[test]
fn test_condition_rendezvous() {
    const N: usize = 3;

    struct Rendezvous {
        lock: McsLock,
        cond: GenerationCond,
        arrived: UnsafeCell<usize>,
    }
    unsafe impl Sync for Rendezvous {}

    let shared = Arc::new(Rendezvous {
        lock: McsLock::new(),
        cond: GenerationCond::new(),
        arrived: UnsafeCell::new(0),
    });

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                let relock = StrategyRelock(&shared.lock);
                shared.lock.lock();
                unsafe {
                    *shared.arrived.get() += 1;
                    shared.cond.broadcast();
                    while *shared.arrived.get() < N {
                        shared.cond.wait(&relock).unwrap();
                    }
                    shared.lock.unlock();
                }
                shared.cond.signal();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(unsafe { *shared.arrived.get() }, N);
}

#[test]
fn test_timed_wait_overshoot_is_bounded() {
    let lock = TicketLock::new();
    let cond = GenerationCond::new();
    let relock = StrategyRelock(&lock);

    lock.lock();
    let start = Instant::now();
    let deadline = Deadline::after(Duration::from_millis(50));
    let result = unsafe { cond.wait_until(&relock, &deadline, DeadlinePrecision::Precise) };
    let elapsed = start.elapsed();

    assert_eq!(result, Err(WaitError::TimedOut));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500), "overshoot: {:?}", elapsed);
    assert!(lock.is_locked());
    unsafe { lock.unlock() };
}

#[test]
fn test_whole_second_deadline_waits_past_nominal() {
    let lock = CasLock::new();
    let cond = GenerationCond::new();
    let relock = StrategyRelock(&lock);

    lock.lock();
    let start = Instant::now();
    let deadline = Deadline::after(Duration::from_millis(10));
    let result = unsafe { cond.wait_until(&relock, &deadline, DeadlinePrecision::WholeSeconds) };

    assert_eq!(result, Err(WaitError::TimedOut));
    // expiry is only observed once the seconds field moves past the deadline's
    assert!(start.elapsed() < Duration::from_millis(2_100));
    assert!(lock.is_locked());
    unsafe { lock.unlock() };
}
