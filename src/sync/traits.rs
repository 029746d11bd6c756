/*!
 * Synchronization Traits
 *
 * The capability contract every pluggable lock strategy implements, and the
 * narrow relock interface the condition engine uses for external mutexes.
 */

use libc::c_int;

/// A pluggable mutual-exclusion algorithm
///
/// The implementing type *is* the strategy's state. It is laid out inside
/// the storage of a native mutex handle and shared by every thread that
/// operates on that handle, so all methods take `&self` and state changes go
/// through interior mutability (atomics).
///
/// # Safety
///
/// Implementors guarantee that:
/// - the all-zero bit pattern is a valid, unlocked value of `Self`
///   (handles are zero-filled before [`init`](LockStrategy::init)). On
///   targets whose `PTHREAD_MUTEX_INITIALIZER` is all zero (Linux, Android)
///   statically initialized handles may be used without `init`. Elsewhere,
///   e.g. Apple, the initializer carries a non-zero signature and such
///   handles must go through `pthread_mutex_init` first;
/// - `Self` fits in a `pthread_mutex_t` (checked at build time by
///   [`assert_fits!`](crate::assert_fits) and by the storage adapter);
/// - no state outlives the handle: anything acquired by `init`, `lock` or
///   `try_lock` is released by `unlock` or `destroy`.
pub unsafe trait LockStrategy: Sync {
    /// Bring zeroed state into a valid, unlocked configuration
    fn init(&self);

    /// Release strategy-internal resources
    fn destroy(&self) {}

    /// Block until exclusive ownership is acquired
    ///
    /// Fairness is up to the algorithm, but the call must terminate once
    /// the owner releases.
    fn lock(&self);

    /// Attempt acquisition without blocking, even momentarily
    fn try_lock(&self) -> bool;

    /// Release ownership obtained by `lock` or a successful `try_lock`
    ///
    /// # Safety
    ///
    /// The calling thread must own the lock.
    unsafe fn unlock(&self);

    /// Strategy name for diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The caller-supplied mutex a condition wait releases and reacquires
///
/// Methods return pthread result codes, so a native mutex and an
/// intercepted one look the same to the condition engine.
pub trait Relock {
    /// # Safety
    ///
    /// The calling thread must hold the mutex.
    unsafe fn unlock(&self) -> c_int;

    fn lock(&self) -> c_int;
}

/// Adapts a strategy held directly (not through a pthread handle) to [`Relock`]
pub struct StrategyRelock<'a, S: LockStrategy>(pub &'a S);

impl<S: LockStrategy> Relock for StrategyRelock<'_, S> {
    #[inline]
    unsafe fn unlock(&self) -> c_int {
        self.0.unlock();
        0
    }

    #[inline]
    fn lock(&self) -> c_int {
        self.0.lock();
        0
    }
}
