/*!
 * Original Implementations
 *
 * The dispatcher forwards to the original pthread/libc functions through
 * `NativeSync`. Which mechanism reaches them is a build-time choice:
 *
 * - [`NextSymbol`](super::NextSymbol): the shim exports the original names
 *   itself, so the originals are looked up with `dlsym(RTLD_NEXT, ..)` on
 *   first use and cached (ELF platforms).
 * - [`DirectCall`](super::DirectCall): the shim exports differently named
 *   substitutes registered in an `__interpose` table; the loader does not
 *   apply the table to the shim's own image, so the originals are called by
 *   name (Apple platforms).
 *
 * Callers of the dispatcher never see which one is active.
 */

use libc::{
    c_int, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t, timespec,
};

/// Hook type accepted by `atexit`
pub type AtExitHook = extern "C" fn();

/// How the original implementations are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// Same-name exports, originals resolved with `dlsym(RTLD_NEXT, ..)`
    DynamicNext,
    /// Substitutes registered in the loader's interposition table
    InterposeTable,
}

/// Access to the original, non-intercepted primitives
///
/// All functions take and return exactly what the C API does; result codes
/// pass through unmodified.
///
/// # Safety
///
/// Every function carries the preconditions of the C function it forwards
/// to.
pub trait NativeSync {
    const MECHANISM: Mechanism;

    unsafe fn mutex_init(mutex: *mut pthread_mutex_t, attr: *const pthread_mutexattr_t) -> c_int;
    unsafe fn mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int;
    unsafe fn mutex_lock(mutex: *mut pthread_mutex_t) -> c_int;
    unsafe fn mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int;
    #[cfg(not(target_vendor = "apple"))]
    unsafe fn mutex_timedlock(mutex: *mut pthread_mutex_t, abstime: *const timespec) -> c_int;
    unsafe fn mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int;

    unsafe fn cond_init(cond: *mut pthread_cond_t, attr: *const pthread_condattr_t) -> c_int;
    unsafe fn cond_destroy(cond: *mut pthread_cond_t) -> c_int;
    unsafe fn cond_wait(cond: *mut pthread_cond_t, mutex: *mut pthread_mutex_t) -> c_int;
    unsafe fn cond_timedwait(
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec,
    ) -> c_int;
    unsafe fn cond_signal(cond: *mut pthread_cond_t) -> c_int;
    unsafe fn cond_broadcast(cond: *mut pthread_cond_t) -> c_int;

    unsafe fn exit(status: c_int) -> !;
    unsafe fn atexit(hook: AtExitHook) -> c_int;
}

/// Mechanism selected for this target
#[cfg(not(target_vendor = "apple"))]
pub type Native = super::NextSymbol;

/// Mechanism selected for this target
#[cfg(target_vendor = "apple")]
pub type Native = super::DirectCall;

/// Mechanism the generated symbols use on this target
#[inline]
pub fn mechanism() -> Mechanism {
    <Native as NativeSync>::MECHANISM
}
