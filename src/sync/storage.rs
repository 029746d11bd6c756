/*!
 * Opaque Handle Storage
 *
 * Reinterprets the storage of native pthread handles as the state of a
 * lock strategy or of the condition engine. This is the only place that
 * casts raw handle memory; everything above works on typed references.
 *
 * # Layout contract
 *
 * A strategy must fit inside `pthread_mutex_t` both in size and alignment.
 * This is checked at compile time: every entry point below forces a
 * post-monomorphization const assertion, and [`assert_fits!`] turns the
 * same check into an eager crate-level assertion.
 *
 * The native view and the strategy view of one handle are mutually
 * exclusive for the handle's lifetime. That exclusion comes from the
 * interception switch discipline, not from this module.
 */

use super::condvar::GenerationCond;
use super::traits::LockStrategy;
use crate::errors::{ShimError, ShimResult};
use libc::{pthread_cond_t, pthread_mutex_t};
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr;

/// Whether `S` can live inside the storage of handle type `H`
#[inline]
#[must_use]
pub const fn fits<S, H>() -> bool {
    size_of::<S>() <= size_of::<H>() && align_of::<S>() <= align_of::<H>()
}

/// Compile-time layout witnesses, evaluated per instantiation
struct Layout<S>(PhantomData<S>);

impl<S> Layout<S> {
    const MUTEX: () = assert!(
        fits::<S, pthread_mutex_t>(),
        "lock strategy state does not fit in pthread_mutex_t"
    );
    const COND: () = assert!(
        fits::<S, pthread_cond_t>(),
        "condition state does not fit in pthread_cond_t"
    );
}

/// Assert at build time that a strategy fits in `pthread_mutex_t`
///
/// ```
/// use lockshim::strategies::CasLock;
/// lockshim::assert_fits!(CasLock);
/// ```
///
/// A strategy that does not fit stops the build, including when it is
/// handed to [`interpose!`](crate::interpose!):
///
/// ```compile_fail
/// use lockshim::LockStrategy;
///
/// #[repr(C)]
/// struct Oversized([u8; 4096]);
///
/// unsafe impl LockStrategy for Oversized {
///     fn init(&self) {}
///     fn lock(&self) {}
///     fn try_lock(&self) -> bool { true }
///     unsafe fn unlock(&self) {}
/// }
///
/// lockshim::interpose!(Oversized);
/// ```
#[macro_export]
macro_rules! assert_fits {
    ($strategy:ty) => {
        const _: () = ::core::assert!(
            $crate::sync::storage::fits::<$strategy, $crate::__private::libc::pthread_mutex_t>(),
            ::core::concat!(
                ::core::stringify!($strategy),
                " does not fit in pthread_mutex_t"
            )
        );
    };
}

/// Runtime view of the layout check, for diagnostics
pub fn check_layout<S: LockStrategy>() -> ShimResult<()> {
    if fits::<S, pthread_mutex_t>() {
        return Ok(());
    }
    Err(ShimError::LayoutMismatch {
        strategy: std::any::type_name::<S>().to_string(),
        size: size_of::<S>(),
        align: align_of::<S>(),
        capacity: size_of::<pthread_mutex_t>(),
        capacity_align: align_of::<pthread_mutex_t>(),
    })
}

/// View a mutex handle as strategy state
///
/// Instantiating it with a strategy larger than the handle is a build
/// error:
///
/// ```compile_fail
/// use lockshim::sync::storage::mutex_state;
/// use lockshim::LockStrategy;
/// use std::mem::MaybeUninit;
///
/// #[repr(C)]
/// struct Oversized([u8; 4096]);
///
/// unsafe impl LockStrategy for Oversized {
///     fn init(&self) {}
///     fn lock(&self) {}
///     fn try_lock(&self) -> bool { true }
///     unsafe fn unlock(&self) {}
/// }
///
/// let mut raw = MaybeUninit::<libc::pthread_mutex_t>::zeroed();
/// let state = unsafe { mutex_state::<Oversized>(raw.as_mut_ptr()) };
/// state.lock();
/// ```
///
/// # Safety
///
/// `mutex` must be non-null, valid for the returned lifetime, and not in use
/// through the native pthread implementation.
#[inline(always)]
pub unsafe fn mutex_state<'a, S: LockStrategy>(mutex: *mut pthread_mutex_t) -> &'a S {
    #[allow(clippy::let_unit_value)]
    let () = Layout::<S>::MUTEX;
    &*mutex.cast::<S>()
}

/// Zero the whole handle region, then let the strategy initialise it
///
/// # Safety
///
/// Same as [`mutex_state`], and no other thread may be using the handle.
pub unsafe fn reset_mutex<'a, S: LockStrategy>(mutex: *mut pthread_mutex_t) -> &'a S {
    #[allow(clippy::let_unit_value)]
    let () = Layout::<S>::MUTEX;
    ptr::write_bytes(mutex.cast::<u8>(), 0, size_of::<pthread_mutex_t>());
    let state = &*mutex.cast::<S>();
    state.init();
    state
}

/// View a condition handle as a generation counter
///
/// # Safety
///
/// `cond` must be non-null, valid for the returned lifetime, and not in use
/// through the native pthread implementation.
#[inline(always)]
pub unsafe fn cond_state<'a>(cond: *mut pthread_cond_t) -> &'a GenerationCond {
    #[allow(clippy::let_unit_value)]
    let () = Layout::<GenerationCond>::COND;
    &*cond.cast::<GenerationCond>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{CasLock, McsLock, TicketLock};
    use std::mem::MaybeUninit;

    crate::assert_fits!(CasLock);
    crate::assert_fits!(TicketLock);
    crate::assert_fits!(McsLock);

    #[repr(C)]
    struct Oversized {
        _bytes: [u8; 4096],
    }

    unsafe impl LockStrategy for Oversized {
        fn init(&self) {}
        fn lock(&self) {}
        fn try_lock(&self) -> bool {
            true
        }
        unsafe fn unlock(&self) {}
    }

    #[test]
    fn test_check_layout_reports_mismatch() {
        assert!(check_layout::<CasLock>().is_ok());
        match check_layout::<Oversized>() {
            Err(ShimError::LayoutMismatch { size, capacity, .. }) => {
                assert_eq!(size, 4096);
                assert_eq!(capacity, size_of::<pthread_mutex_t>());
            }
            other => panic!("expected layout mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_zeroes_whole_region() {
        let mut raw = MaybeUninit::<pthread_mutex_t>::uninit();
        unsafe {
            ptr::write_bytes(raw.as_mut_ptr().cast::<u8>(), 0xAB, size_of::<pthread_mutex_t>());
            let lock = reset_mutex::<CasLock>(raw.as_mut_ptr());
            assert!(!lock.is_locked());
            let bytes = std::slice::from_raw_parts(
                raw.as_ptr().cast::<u8>(),
                size_of::<pthread_mutex_t>(),
            );
            assert!(bytes.iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_views_alias_handle_memory() {
        let mut raw = MaybeUninit::<pthread_mutex_t>::zeroed();
        unsafe {
            let a = mutex_state::<CasLock>(raw.as_mut_ptr());
            let b = mutex_state::<CasLock>(raw.as_mut_ptr());
            assert!(a.try_lock());
            assert!(b.is_locked());
            b.unlock();
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_static_initializer_is_unlocked_state() {
        let mut raw = libc::PTHREAD_MUTEX_INITIALIZER;
        let bytes = unsafe {
            std::slice::from_raw_parts(
                (&raw as *const pthread_mutex_t).cast::<u8>(),
                size_of::<pthread_mutex_t>(),
            )
        };
        assert!(bytes.iter().all(|b| *b == 0));

        unsafe {
            let lock = mutex_state::<McsLock>(&mut raw);
            assert!(!lock.is_locked());
            assert!(lock.try_lock());
            lock.unlock();
            assert!(mutex_state::<TicketLock>(&mut raw).try_lock());
        }
    }

    #[test]
    fn test_cond_view_reads_counter() {
        let mut raw = MaybeUninit::<pthread_cond_t>::zeroed();
        unsafe {
            let c = cond_state(raw.as_mut_ptr());
            c.init();
            c.signal();
            assert_eq!(cond_state(raw.as_mut_ptr()).generation(), 1);
        }
    }
}
