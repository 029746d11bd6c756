/*!
 * Deferred Dynamic Resolution
 *
 * When the shim exports functions under the original names, every call in
 * the process (other libraries included) binds to the shim. The original
 * is the *next* definition in the loader's search order, found with
 * `dlsym(RTLD_NEXT, name)` on first use and cached for the process
 * lifetime.
 *
 * # Cache discipline
 *
 * A slot is resolved at most once per racing thread and never changes
 * afterwards. Concurrent first resolutions are not synchronized: every
 * racer resolves the same address, so the `Relaxed` store is idempotent.
 *
 * Resolution must not log: a subscriber may take locks that route straight
 * back into an unresolved slot.
 */

use super::native::{AtExitHook, Mechanism, NativeSync};
use crate::errors::ShimError;
use libc::{
    c_int, c_void, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t,
    timespec,
};
use std::ffi::CStr;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Lazily resolved address of one original function
pub struct SymbolSlot {
    name: &'static CStr,
    version: Option<&'static CStr>,
    addr: AtomicPtr<c_void>,
}

impl SymbolSlot {
    pub const fn new(name: &'static CStr) -> Self {
        Self {
            name,
            version: None,
            addr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Prefer a specific symbol version where the C library versions symbols
    pub const fn versioned(name: &'static CStr, version: &'static CStr) -> Self {
        Self {
            name,
            version: Some(version),
            addr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn name(&self) -> &'static CStr {
        self.name
    }

    pub fn is_resolved(&self) -> bool {
        !self.addr.load(Ordering::Relaxed).is_null()
    }

    /// Address of the original, resolving it on first use
    ///
    /// Aborts the process if the symbol cannot be found: there is no
    /// implementation left to forward to.
    #[inline]
    pub fn get(&self) -> *mut c_void {
        let addr = self.addr.load(Ordering::Relaxed);
        if !addr.is_null() {
            return addr;
        }
        self.resolve()
    }

    #[cold]
    fn resolve(&self) -> *mut c_void {
        // SAFETY: `name` and `version` are NUL-terminated static strings.
        let addr = unsafe { lookup_next(self.name, self.version) };
        if addr.is_null() {
            unresolved(self.name);
        }
        self.addr.store(addr, Ordering::Relaxed);
        addr
    }

    /// The original as a typed function pointer
    ///
    /// # Safety
    ///
    /// `F` must be the `extern "C"` function pointer type of the symbol.
    #[inline(always)]
    unsafe fn func<F: Copy>(&self) -> F {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        mem::transmute_copy(&self.get())
    }
}

unsafe fn lookup_next(name: &CStr, version: Option<&CStr>) -> *mut c_void {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    if let Some(version) = version {
        let addr = libc::dlvsym(libc::RTLD_NEXT, name.as_ptr(), version.as_ptr());
        if !addr.is_null() {
            return addr;
        }
    }
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    let _ = version;

    libc::dlsym(libc::RTLD_NEXT, name.as_ptr())
}

#[cold]
fn unresolved(name: &CStr) -> ! {
    let err = ShimError::SymbolUnresolved(name.to_string_lossy().into_owned());
    eprintln!("lockshim: fatal: {}", err);
    std::process::abort()
}

// glibc keeps a pre-2.3.2 condition variable ABI around as the compat
// version; an unversioned lookup may return it.
const COND_ABI: &CStr = c"GLIBC_2.3.2";

static MUTEX_INIT: SymbolSlot = SymbolSlot::new(c"pthread_mutex_init");
static MUTEX_DESTROY: SymbolSlot = SymbolSlot::new(c"pthread_mutex_destroy");
static MUTEX_LOCK: SymbolSlot = SymbolSlot::new(c"pthread_mutex_lock");
static MUTEX_TRYLOCK: SymbolSlot = SymbolSlot::new(c"pthread_mutex_trylock");
static MUTEX_TIMEDLOCK: SymbolSlot = SymbolSlot::new(c"pthread_mutex_timedlock");
static MUTEX_UNLOCK: SymbolSlot = SymbolSlot::new(c"pthread_mutex_unlock");
static COND_INIT: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_init", COND_ABI);
static COND_DESTROY: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_destroy", COND_ABI);
static COND_WAIT: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_wait", COND_ABI);
static COND_TIMEDWAIT: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_timedwait", COND_ABI);
static COND_SIGNAL: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_signal", COND_ABI);
static COND_BROADCAST: SymbolSlot = SymbolSlot::versioned(c"pthread_cond_broadcast", COND_ABI);
static EXIT: SymbolSlot = SymbolSlot::new(c"exit");
static ATEXIT: SymbolSlot = SymbolSlot::new(c"atexit");

/// Every slot, for diagnostics
static SLOTS: &[&SymbolSlot] = &[
    &MUTEX_INIT,
    &MUTEX_DESTROY,
    &MUTEX_LOCK,
    &MUTEX_TRYLOCK,
    &MUTEX_TIMEDLOCK,
    &MUTEX_UNLOCK,
    &COND_INIT,
    &COND_DESTROY,
    &COND_WAIT,
    &COND_TIMEDWAIT,
    &COND_SIGNAL,
    &COND_BROADCAST,
    &EXIT,
    &ATEXIT,
];

type MutexFn = unsafe extern "C" fn(*mut pthread_mutex_t) -> c_int;
type MutexInitFn = unsafe extern "C" fn(*mut pthread_mutex_t, *const pthread_mutexattr_t) -> c_int;
#[cfg(not(target_vendor = "apple"))]
type MutexTimedFn = unsafe extern "C" fn(*mut pthread_mutex_t, *const timespec) -> c_int;
type CondFn = unsafe extern "C" fn(*mut pthread_cond_t) -> c_int;
type CondInitFn = unsafe extern "C" fn(*mut pthread_cond_t, *const pthread_condattr_t) -> c_int;
type CondWaitFn = unsafe extern "C" fn(*mut pthread_cond_t, *mut pthread_mutex_t) -> c_int;
type CondTimedFn =
    unsafe extern "C" fn(*mut pthread_cond_t, *mut pthread_mutex_t, *const timespec) -> c_int;
type ExitFn = unsafe extern "C" fn(c_int) -> !;
type AtExitFn = unsafe extern "C" fn(AtExitHook) -> c_int;

/// Originals found with `dlsym(RTLD_NEXT, ..)`
pub struct NextSymbol;

impl NextSymbol {
    /// Names of the originals resolved so far
    pub fn resolved() -> Vec<&'static CStr> {
        SLOTS
            .iter()
            .filter(|slot| slot.is_resolved())
            .map(|slot| slot.name())
            .collect()
    }
}

impl NativeSync for NextSymbol {
    const MECHANISM: Mechanism = Mechanism::DynamicNext;

    #[inline]
    unsafe fn mutex_init(mutex: *mut pthread_mutex_t, attr: *const pthread_mutexattr_t) -> c_int {
        MUTEX_INIT.func::<MutexInitFn>()(mutex, attr)
    }

    #[inline]
    unsafe fn mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int {
        MUTEX_DESTROY.func::<MutexFn>()(mutex)
    }

    #[inline]
    unsafe fn mutex_lock(mutex: *mut pthread_mutex_t) -> c_int {
        MUTEX_LOCK.func::<MutexFn>()(mutex)
    }

    #[inline]
    unsafe fn mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int {
        MUTEX_TRYLOCK.func::<MutexFn>()(mutex)
    }

    #[cfg(not(target_vendor = "apple"))]
    #[inline]
    unsafe fn mutex_timedlock(mutex: *mut pthread_mutex_t, abstime: *const timespec) -> c_int {
        MUTEX_TIMEDLOCK.func::<MutexTimedFn>()(mutex, abstime)
    }

    #[inline]
    unsafe fn mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int {
        MUTEX_UNLOCK.func::<MutexFn>()(mutex)
    }

    #[inline]
    unsafe fn cond_init(cond: *mut pthread_cond_t, attr: *const pthread_condattr_t) -> c_int {
        COND_INIT.func::<CondInitFn>()(cond, attr)
    }

    #[inline]
    unsafe fn cond_destroy(cond: *mut pthread_cond_t) -> c_int {
        COND_DESTROY.func::<CondFn>()(cond)
    }

    #[inline]
    unsafe fn cond_wait(cond: *mut pthread_cond_t, mutex: *mut pthread_mutex_t) -> c_int {
        COND_WAIT.func::<CondWaitFn>()(cond, mutex)
    }

    #[inline]
    unsafe fn cond_timedwait(
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec,
    ) -> c_int {
        COND_TIMEDWAIT.func::<CondTimedFn>()(cond, mutex, abstime)
    }

    #[inline]
    unsafe fn cond_signal(cond: *mut pthread_cond_t) -> c_int {
        COND_SIGNAL.func::<CondFn>()(cond)
    }

    #[inline]
    unsafe fn cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
        COND_BROADCAST.func::<CondFn>()(cond)
    }

    unsafe fn exit(status: c_int) -> ! {
        EXIT.func::<ExitFn>()(status)
    }

    unsafe fn atexit(hook: AtExitHook) -> c_int {
        ATEXIT.func::<AtExitFn>()(hook)
    }
}
