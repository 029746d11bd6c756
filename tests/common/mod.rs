/*!
 * Shared test helpers
 */

#![allow(dead_code)]

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

/// Zero-initialized C object shared across test threads by address
pub struct Shared<T>(UnsafeCell<MaybeUninit<T>>);

// SAFETY: tests only touch the contents through the primitives under test.
unsafe impl<T> Sync for Shared<T> {}
unsafe impl<T> Send for Shared<T> {}

impl<T> Shared<T> {
    pub fn zeroed() -> Self {
        Shared(UnsafeCell::new(MaybeUninit::zeroed()))
    }

    pub fn as_ptr(&self) -> *mut T {
        self.0.get().cast()
    }
}

/// Plain value guarded by a mutex under test
pub struct Guarded<T>(UnsafeCell<T>);

unsafe impl<T: Send> Sync for Guarded<T> {}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Guarded(UnsafeCell::new(value))
    }

    /// # Safety
    ///
    /// Caller holds the guarding mutex.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get(&self) -> &mut T {
        &mut *self.0.get()
    }
}

pub type Mutex = Shared<libc::pthread_mutex_t>;
pub type Cond = Shared<libc::pthread_cond_t>;
