/*!
 * lockshim
 * Pluggable lock strategies behind the pthread mutex and condition API
 *
 * The shim takes over `pthread_mutex_*`, `pthread_cond_*` and `exit` for a
 * whole process. While the interception switch is on, mutex calls run a
 * user-supplied [`LockStrategy`] laid out inside the `pthread_mutex_t`
 * itself, and condition variables become a spinning generation counter.
 * While it is off, every call reaches the original implementation
 * unchanged.
 *
 * ```ignore
 * // in a cdylib loaded with LD_PRELOAD / DYLD_INSERT_LIBRARIES
 * lockshim::interpose!(lockshim::strategies::TicketLock, init = lockshim::ShimConfig::default());
 * ```
 */

pub mod config;
pub mod errors;
pub mod interpose;
pub mod logging;
pub mod runtime;
pub mod strategies;
pub mod sync;

// Re-exports
pub use config::{DeadlinePrecision, ShimConfig};
pub use errors::{ShimError, ShimResult};
pub use interpose::lifecycle::prepare_exit;
pub use runtime::{init, runtime, Runtime, SwitchState};
pub use sync::{GenerationCond, LockStrategy};

#[doc(hidden)]
pub mod __private {
    pub use libc;
}
