/*!
 * Interception Dispatcher
 *
 * One function per intercepted primitive. Each reads the interception
 * switch and then either forwards to the original through `N`, returning
 * its result code untouched, or runs the plugged-in strategy `S` (or the
 * generation condvar) on the handle's own storage.
 *
 * Result codes on the strategy path:
 *
 * | outcome              | code        |
 * |----------------------|-------------|
 * | success              | `0`         |
 * | trylock while held   | `EBUSY`     |
 * | condition timed out  | `ETIMEDOUT` |
 * | bad handle/deadline  | `EINVAL`    |
 *
 * Nothing here logs on the per-call path.
 */

use super::native::NativeSync;
use crate::errors::ShimError;
use crate::runtime::runtime;
use crate::sync::storage::{cond_state, mutex_state, reset_mutex};
use crate::sync::{Deadline, LockStrategy, Relock};
use libc::{
    c_int, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t, timespec,
};
use std::marker::PhantomData;

/// Strategy-path result for a null handle
const BAD_HANDLE: c_int = libc::EINVAL;

/// # Safety
///
/// `mutex` must point to writable storage for a `pthread_mutex_t` that no
/// other thread is using.
#[inline]
pub unsafe fn mutex_init<S: LockStrategy, N: NativeSync>(
    mutex: *mut pthread_mutex_t,
    attr: *const pthread_mutexattr_t,
) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_init(mutex, attr);
    }
    if mutex.is_null() {
        return BAD_HANDLE;
    }

    // Attributes (type, robustness, pshared) have no meaning to a strategy.
    reset_mutex::<S>(mutex);
    0
}

/// # Safety
///
/// `mutex` must be an initialized, unlocked handle.
#[inline]
pub unsafe fn mutex_destroy<S: LockStrategy, N: NativeSync>(mutex: *mut pthread_mutex_t) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_destroy(mutex);
    }
    if mutex.is_null() {
        return BAD_HANDLE;
    }

    mutex_state::<S>(mutex).destroy();
    0
}

/// # Safety
///
/// `mutex` must be an initialized handle.
#[inline]
pub unsafe fn mutex_lock<S: LockStrategy, N: NativeSync>(mutex: *mut pthread_mutex_t) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_lock(mutex);
    }
    if mutex.is_null() {
        return BAD_HANDLE;
    }

    mutex_state::<S>(mutex).lock();
    0
}

/// # Safety
///
/// `mutex` must be an initialized handle.
#[inline]
pub unsafe fn mutex_trylock<S: LockStrategy, N: NativeSync>(mutex: *mut pthread_mutex_t) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_trylock(mutex);
    }
    if mutex.is_null() {
        return BAD_HANDLE;
    }

    if mutex_state::<S>(mutex).try_lock() {
        0
    } else {
        ShimError::WouldBlock.errno()
    }
}

/// Deadline-bounded acquisition
///
/// Strategies have no timed acquire, so with interception enabled this
/// turns interception off, logs, and panics instead of degrading to a
/// plain `lock` or a `try_lock` poll.
///
/// # Safety
///
/// `mutex` must be an initialized handle and `abstime` a valid timespec.
#[cfg(not(target_vendor = "apple"))]
#[inline]
pub unsafe fn mutex_timedlock<S: LockStrategy, N: NativeSync>(
    mutex: *mut pthread_mutex_t,
    abstime: *const timespec,
) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_timedlock(mutex, abstime);
    }
    timedlock_unsupported::<S>()
}

#[cfg(not(target_vendor = "apple"))]
#[cold]
#[inline(never)]
fn timedlock_unsupported<S: LockStrategy>() -> ! {
    // The process is going down; switch off first so the subscriber never
    // runs on strategy-backed locks.
    runtime().store_quiet(false);

    let err = ShimError::TimedLockUnsupported;
    tracing::error!(
        strategy = std::any::type_name::<S>(),
        errno = err.errno(),
        "pthread_mutex_timedlock called with interception enabled"
    );
    panic!("{}", err)
}

/// # Safety
///
/// The calling thread must hold `mutex`.
#[inline]
pub unsafe fn mutex_unlock<S: LockStrategy, N: NativeSync>(mutex: *mut pthread_mutex_t) -> c_int {
    if !runtime().is_enabled() {
        return N::mutex_unlock(mutex);
    }
    if mutex.is_null() {
        return BAD_HANDLE;
    }

    mutex_state::<S>(mutex).unlock();
    0
}

/// # Safety
///
/// `cond` must point to writable storage for a `pthread_cond_t` that no
/// other thread is using.
#[inline]
pub unsafe fn cond_init<N: NativeSync>(
    cond: *mut pthread_cond_t,
    attr: *const pthread_condattr_t,
) -> c_int {
    if !runtime().is_enabled() {
        return N::cond_init(cond, attr);
    }
    if cond.is_null() {
        return BAD_HANDLE;
    }

    cond_state(cond).init();
    0
}

/// # Safety
///
/// `cond` must be an initialized handle with no waiters.
#[inline]
pub unsafe fn cond_destroy<N: NativeSync>(cond: *mut pthread_cond_t) -> c_int {
    if !runtime().is_enabled() {
        return N::cond_destroy(cond);
    }
    if cond.is_null() {
        return BAD_HANDLE;
    }

    cond_state(cond).destroy();
    0
}

/// Spin until signaled, releasing and reacquiring `mutex` around the wait
///
/// # Safety
///
/// `cond` must be an initialized handle and the calling thread must hold
/// `mutex`.
#[inline]
pub unsafe fn cond_wait<S: LockStrategy, N: NativeSync>(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
) -> c_int {
    if !runtime().is_enabled() {
        return N::cond_wait(cond, mutex);
    }
    if cond.is_null() || mutex.is_null() {
        return BAD_HANDLE;
    }

    let relock = DispatchedMutex::<S, N>::new(mutex);
    match cond_state(cond).wait(&relock) {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}

/// Like [`cond_wait`], bounded by the absolute `CLOCK_REALTIME` deadline
/// `abstime`
///
/// Returns `ETIMEDOUT` once the deadline passes, with `mutex` held again.
///
/// # Safety
///
/// As for [`cond_wait`]; `abstime` must be null or point to a timespec.
#[inline]
pub unsafe fn cond_timedwait<S: LockStrategy, N: NativeSync>(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
    abstime: *const timespec,
) -> c_int {
    let rt = runtime();
    if !rt.is_enabled() {
        return N::cond_timedwait(cond, mutex, abstime);
    }
    if cond.is_null() || mutex.is_null() || abstime.is_null() {
        return BAD_HANDLE;
    }

    let deadline = match Deadline::from_timespec(&*abstime) {
        Ok(deadline) => deadline,
        Err(err) => return err.errno(),
    };

    let relock = DispatchedMutex::<S, N>::new(mutex);
    match cond_state(cond).wait_until(&relock, &deadline, rt.deadline_precision()) {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}

/// # Safety
///
/// `cond` must be an initialized handle.
#[inline]
pub unsafe fn cond_signal<N: NativeSync>(cond: *mut pthread_cond_t) -> c_int {
    if !runtime().is_enabled() {
        return N::cond_signal(cond);
    }
    if cond.is_null() {
        return BAD_HANDLE;
    }

    cond_state(cond).signal();
    0
}

/// Wakes every waiter; indistinguishable from [`cond_signal`] on the
/// strategy path
///
/// # Safety
///
/// `cond` must be an initialized handle.
#[inline]
pub unsafe fn cond_broadcast<N: NativeSync>(cond: *mut pthread_cond_t) -> c_int {
    if !runtime().is_enabled() {
        return N::cond_broadcast(cond);
    }
    if cond.is_null() {
        return BAD_HANDLE;
    }

    cond_state(cond).broadcast();
    0
}

/// An external mutex as seen by a condition wait
///
/// Unlock and relock go back through the dispatcher, so the mutex is
/// handled according to the switch like any other call.
pub struct DispatchedMutex<S, N> {
    raw: *mut pthread_mutex_t,
    _marker: PhantomData<(fn() -> S, fn() -> N)>,
}

impl<S: LockStrategy, N: NativeSync> DispatchedMutex<S, N> {
    /// # Safety
    ///
    /// `raw` must stay a valid, initialized handle for the lifetime of the
    /// returned value.
    pub unsafe fn new(raw: *mut pthread_mutex_t) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

impl<S: LockStrategy, N: NativeSync> Relock for DispatchedMutex<S, N> {
    #[inline]
    unsafe fn unlock(&self) -> c_int {
        mutex_unlock::<S, N>(self.raw)
    }

    #[inline]
    fn lock(&self) -> c_int {
        // SAFETY: validity of `raw` is the constructor's contract.
        unsafe { mutex_lock::<S, N>(self.raw) }
    }
}
