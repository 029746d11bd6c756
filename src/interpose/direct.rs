/*!
 * Direct Calls and the Interposition Table
 *
 * On Apple platforms the loader rewrites calls through an `__interpose`
 * section of `{ substitute, original }` pairs. The table is not applied to
 * the image that carries it, so inside the shim the originals are plain
 * function calls.
 *
 * `DirectCall` is also a usable [`NativeSync`] anywhere the calling image
 * does not itself export the intercepted names, e.g. unit tests driving the
 * dispatcher. Inside an image that exports them on an ELF platform these
 * calls would bind back to the shim.
 */

use super::native::{AtExitHook, Mechanism, NativeSync};
use libc::{
    c_int, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t, timespec,
};

/// One `__interpose` entry as the loader reads it
#[repr(C)]
pub struct InterposeEntry {
    pub substitute: *const (),
    pub original: *const (),
}

// SAFETY: entries are immutable function addresses.
unsafe impl Sync for InterposeEntry {}

/// Originals called by name
pub struct DirectCall;

impl NativeSync for DirectCall {
    const MECHANISM: Mechanism = Mechanism::InterposeTable;

    #[inline]
    unsafe fn mutex_init(mutex: *mut pthread_mutex_t, attr: *const pthread_mutexattr_t) -> c_int {
        libc::pthread_mutex_init(mutex, attr)
    }

    #[inline]
    unsafe fn mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int {
        libc::pthread_mutex_destroy(mutex)
    }

    #[inline]
    unsafe fn mutex_lock(mutex: *mut pthread_mutex_t) -> c_int {
        libc::pthread_mutex_lock(mutex)
    }

    #[inline]
    unsafe fn mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int {
        libc::pthread_mutex_trylock(mutex)
    }

    #[cfg(not(target_vendor = "apple"))]
    #[inline]
    unsafe fn mutex_timedlock(mutex: *mut pthread_mutex_t, abstime: *const timespec) -> c_int {
        libc::pthread_mutex_timedlock(mutex, abstime)
    }

    #[inline]
    unsafe fn mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int {
        libc::pthread_mutex_unlock(mutex)
    }

    #[inline]
    unsafe fn cond_init(cond: *mut pthread_cond_t, attr: *const pthread_condattr_t) -> c_int {
        libc::pthread_cond_init(cond, attr)
    }

    #[inline]
    unsafe fn cond_destroy(cond: *mut pthread_cond_t) -> c_int {
        libc::pthread_cond_destroy(cond)
    }

    #[inline]
    unsafe fn cond_wait(cond: *mut pthread_cond_t, mutex: *mut pthread_mutex_t) -> c_int {
        libc::pthread_cond_wait(cond, mutex)
    }

    #[inline]
    unsafe fn cond_timedwait(
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec,
    ) -> c_int {
        libc::pthread_cond_timedwait(cond, mutex, abstime)
    }

    #[inline]
    unsafe fn cond_signal(cond: *mut pthread_cond_t) -> c_int {
        libc::pthread_cond_signal(cond)
    }

    #[inline]
    unsafe fn cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
        libc::pthread_cond_broadcast(cond)
    }

    unsafe fn exit(status: c_int) -> ! {
        libc::exit(status)
    }

    unsafe fn atexit(hook: AtExitHook) -> c_int {
        libc::atexit(hook)
    }
}
