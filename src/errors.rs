/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Every recoverable outcome of an intercepted call ends up as a pthread
 * result code; `ShimError::errno` is the single place that translation
 * happens.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for shim operations
pub type ShimResult<T> = Result<T, ShimError>;

/// Errors surfaced by the interception layer
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ShimError {
    #[error("pthread_mutex_timedlock() is not implemented while interception is enabled")]
    #[diagnostic(
        code(dispatch::timedlock_unsupported),
        help("LockStrategy has no timed acquire. Extend the strategy or disable interception.")
    )]
    TimedLockUnsupported,

    #[error("Lock is held by another owner")]
    #[diagnostic(
        code(dispatch::would_block),
        help("try_lock never blocks. Retry later or use a blocking lock.")
    )]
    WouldBlock,

    #[error("Deadline elapsed before the condition was signaled")]
    #[diagnostic(code(condvar::timed_out))]
    TimedOut,

    #[error("Invalid deadline: tv_nsec = {0}")]
    #[diagnostic(
        code(condvar::invalid_deadline),
        help("tv_nsec must be within [0, 1_000_000_000).")
    )]
    InvalidDeadline(i64),

    #[error(
        "Strategy `{strategy}` ({size} bytes, align {align}) does not fit the reserved \
         handle storage ({capacity} bytes, align {capacity_align})"
    )]
    #[diagnostic(
        code(storage::layout_mismatch),
        help("Shrink the strategy state or reduce its alignment. This is a build-time contract.")
    )]
    LayoutMismatch {
        strategy: String,
        size: usize,
        align: usize,
        capacity: usize,
        capacity_align: usize,
    },

    #[error("Releasing the mutex for a condition wait failed with code {0}")]
    #[diagnostic(
        code(condvar::unlock_failed),
        help("The calling thread must hold the mutex it waits with.")
    )]
    UnlockFailed(i32),

    #[error("Reacquiring the mutex after a condition wait failed with code {0}")]
    #[diagnostic(code(condvar::relock_failed))]
    RelockFailed(i32),

    #[error("Original symbol `{0}` could not be resolved")]
    #[diagnostic(
        code(interpose::symbol_unresolved),
        help("The shim must be loaded ahead of the C library that defines the symbol.")
    )]
    SymbolUnresolved(String),
}

impl ShimError {
    /// pthread result code for this outcome
    pub fn errno(&self) -> libc::c_int {
        match self {
            ShimError::WouldBlock => libc::EBUSY,
            ShimError::TimedOut => libc::ETIMEDOUT,
            ShimError::InvalidDeadline(_) | ShimError::LayoutMismatch { .. } => libc::EINVAL,
            ShimError::TimedLockUnsupported => libc::ENOSYS,
            ShimError::UnlockFailed(code) | ShimError::RelockFailed(code) => *code,
            ShimError::SymbolUnresolved(_) => libc::ENOENT,
        }
    }

    /// Whether a caller can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShimError::WouldBlock | ShimError::TimedOut | ShimError::InvalidDeadline(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(ShimError::WouldBlock.errno(), libc::EBUSY);
        assert_eq!(ShimError::TimedOut.errno(), libc::ETIMEDOUT);
        assert_eq!(ShimError::InvalidDeadline(-1).errno(), libc::EINVAL);
        assert_eq!(ShimError::UnlockFailed(libc::EPERM).errno(), libc::EPERM);
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        assert!(!ShimError::TimedLockUnsupported.is_recoverable());
        assert!(!ShimError::SymbolUnresolved("exit".into()).is_recoverable());
        assert!(ShimError::WouldBlock.is_recoverable());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&ShimError::SymbolUnresolved("exit".into())).unwrap();
        assert_eq!(
            json,
            r#"{"error_type":"symbol_unresolved","details":"exit"}"#
        );
    }
}
