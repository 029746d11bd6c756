/*!
 * Symbol Generation
 *
 * `interpose!` expands, inside the embedding crate, to the exported
 * functions that take over the pthread primitives for one strategy. The
 * crate building the shim (usually a `cdylib` loaded with `LD_PRELOAD` or
 * `DYLD_INSERT_LIBRARIES`) invokes it exactly once.
 */

/// Export interposed pthread primitives backed by `$strategy`
///
/// ```ignore
/// lockshim::interpose!(lockshim::strategies::TicketLock);
///
/// // optionally apply a configuration from a load-time constructor
/// lockshim::interpose!(
///     lockshim::strategies::McsLock,
///     init = lockshim::ShimConfig::default()
/// );
/// ```
///
/// Generates:
/// - a build-time check that the strategy fits `pthread_mutex_t`;
/// - `pthread_mutex_{init,destroy,lock,trylock,unlock}`,
///   `pthread_mutex_timedlock` (not on Apple),
///   `pthread_cond_{init,destroy,wait,timedwait,signal,broadcast}`,
///   `exit`, and `atexit` (NetBSD);
/// - on ELF targets, `#[no_mangle]` definitions with the original names;
///   on Apple, substitutes listed in the `__DATA,__interpose` section.
#[macro_export]
macro_rules! interpose {
    ($strategy:ty $(,)?) => {
        $crate::__interpose_symbols!($strategy);
    };
    ($strategy:ty, init = $config:expr $(,)?) => {
        $crate::__interpose_symbols!($strategy);
        $crate::__interpose_constructor!($config);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interpose_symbols {
    ($strategy:ty) => {
        $crate::assert_fits!($strategy);

        #[doc(hidden)]
        type __LockshimStrategy = $strategy;

        #[doc(hidden)]
        #[allow(unused_imports)]
        mod __lockshim_symbols {
            use super::__LockshimStrategy as S;
            use $crate::__private::libc::{
                c_int, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t,
                timespec,
            };
            use $crate::interpose::{dispatch, lifecycle, AtExitHook, Native};

            $crate::__interpose_fn! {
                fn pthread_mutex_init(
                    mutex: *mut pthread_mutex_t,
                    attr: *const pthread_mutexattr_t
                ) -> c_int {
                    dispatch::mutex_init::<S, Native>(mutex, attr)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int {
                    dispatch::mutex_destroy::<S, Native>(mutex)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_mutex_lock(mutex: *mut pthread_mutex_t) -> c_int {
                    dispatch::mutex_lock::<S, Native>(mutex)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int {
                    dispatch::mutex_trylock::<S, Native>(mutex)
                }
            }

            #[cfg(not(target_vendor = "apple"))]
            $crate::__interpose_fn! {
                fn pthread_mutex_timedlock(
                    mutex: *mut pthread_mutex_t,
                    abstime: *const timespec
                ) -> c_int {
                    dispatch::mutex_timedlock::<S, Native>(mutex, abstime)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int {
                    dispatch::mutex_unlock::<S, Native>(mutex)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_init(
                    cond: *mut pthread_cond_t,
                    attr: *const pthread_condattr_t
                ) -> c_int {
                    dispatch::cond_init::<Native>(cond, attr)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_destroy(cond: *mut pthread_cond_t) -> c_int {
                    dispatch::cond_destroy::<Native>(cond)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_wait(
                    cond: *mut pthread_cond_t,
                    mutex: *mut pthread_mutex_t
                ) -> c_int {
                    dispatch::cond_wait::<S, Native>(cond, mutex)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_timedwait(
                    cond: *mut pthread_cond_t,
                    mutex: *mut pthread_mutex_t,
                    abstime: *const timespec
                ) -> c_int {
                    dispatch::cond_timedwait::<S, Native>(cond, mutex, abstime)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_signal(cond: *mut pthread_cond_t) -> c_int {
                    dispatch::cond_signal::<Native>(cond)
                }
            }

            $crate::__interpose_fn! {
                fn pthread_cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
                    dispatch::cond_broadcast::<Native>(cond)
                }
            }

            $crate::__interpose_fn! {
                fn exit(status: c_int) -> ! {
                    lifecycle::exit::<Native>(status)
                }
            }

            #[cfg(target_os = "netbsd")]
            $crate::__interpose_fn! {
                fn atexit(hook: AtExitHook) -> c_int {
                    lifecycle::atexit::<Native>(hook)
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interpose_fn {
    (fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> ! $body:block) => {
        #[cfg_attr(not(target_vendor = "apple"), no_mangle)]
        pub unsafe extern "C" fn $name($($arg: $ty),*) -> ! $body

        $crate::__interpose_entry!($name);
    };
    (fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty $body:block) => {
        #[cfg_attr(not(target_vendor = "apple"), no_mangle)]
        pub unsafe extern "C" fn $name($($arg: $ty),*) -> $ret $body

        $crate::__interpose_entry!($name);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interpose_entry {
    ($name:ident) => {
        #[cfg(target_vendor = "apple")]
        const _: () = {
            #[link_section = "__DATA,__interpose"]
            #[used]
            static ENTRY: $crate::interpose::InterposeEntry = $crate::interpose::InterposeEntry {
                substitute: $name as *const (),
                original: $crate::__private::libc::$name as *const (),
            };
        };
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interpose_constructor {
    ($config:expr) => {
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "freebsd",
            target_os = "netbsd"
        ))]
        #[link_section = ".init_array"]
        #[used]
        static __LOCKSHIM_INIT: extern "C" fn() = {
            extern "C" fn __lockshim_init() {
                $crate::init($config);
            }
            __lockshim_init
        };

        #[cfg(target_vendor = "apple")]
        #[link_section = "__DATA,__mod_init_func"]
        #[used]
        static __LOCKSHIM_INIT: extern "C" fn() = {
            extern "C" fn __lockshim_init() {
                $crate::init($config);
            }
            __lockshim_init
        };
    };
}
