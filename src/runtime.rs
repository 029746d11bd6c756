/*!
 * Interception Runtime
 *
 * Process-wide state shared by every intercepted call: the interception
 * switch and the applied configuration.
 *
 * # Switch discipline
 *
 * The switch is read with `Relaxed` ordering before every intercepted call.
 * It is advisory: it is only expected to change during single-threaded
 * startup and teardown windows. The set of handles locked while the switch
 * is on must be disjoint from the set used while it is off; a handle must
 * never be locked under one mode and unlocked under the other.
 */

use crate::config::{DeadlinePrecision, ShimConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tracing::{debug, info};

/// Observable state of the interception switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// Calls are routed to the plugged-in strategy
    Enabled,
    /// Calls are forwarded to the original implementation
    Disabled,
}

impl SwitchState {
    #[inline(always)]
    pub fn is_enabled(self) -> bool {
        matches!(self, SwitchState::Enabled)
    }
}

impl From<bool> for SwitchState {
    fn from(enabled: bool) -> Self {
        if enabled {
            SwitchState::Enabled
        } else {
            SwitchState::Disabled
        }
    }
}

/// Process-wide interception state
///
/// There is exactly one instance per process, reachable through
/// [`runtime`] or returned by [`init`].
pub struct Runtime {
    enabled: AtomicBool,
    precision: AtomicU8,
}

static RUNTIME: Runtime = Runtime::new();

impl Runtime {
    const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            precision: AtomicU8::new(DeadlinePrecision::Precise.as_u8()),
        }
    }

    /// Whether intercepted calls currently go to the strategy
    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn state(&self) -> SwitchState {
        SwitchState::from(self.is_enabled())
    }

    /// Set the switch
    ///
    /// Logging may itself take locks, so it only happens while interception
    /// is off: before turning it on, after turning it off.
    pub fn control(&self, enable: bool) {
        if enable {
            debug!(enabled = true, "interception switch set");
            self.enabled.store(true, Ordering::Relaxed);
        } else {
            self.enabled.store(false, Ordering::Relaxed);
            debug!(enabled = false, "interception switch set");
        }
    }

    pub fn enable(&self) {
        self.control(true);
    }

    pub fn disable(&self) {
        self.control(false);
    }

    /// Flip the switch without logging
    ///
    /// Used on paths where the logging stack may already be torn down or
    /// may itself be mid-way through an intercepted call.
    #[inline(always)]
    pub(crate) fn store_quiet(&self, enable: bool) {
        self.enabled.store(enable, Ordering::Relaxed);
    }

    #[inline]
    pub fn deadline_precision(&self) -> DeadlinePrecision {
        DeadlinePrecision::from_u8(self.precision.load(Ordering::Relaxed))
    }

    pub fn set_deadline_precision(&self, precision: DeadlinePrecision) {
        self.precision.store(precision.as_u8(), Ordering::Relaxed);
    }

    /// Current configuration as seen by intercepted calls
    pub fn config(&self) -> ShimConfig {
        ShimConfig {
            start_enabled: self.is_enabled(),
            deadline_precision: self.deadline_precision(),
        }
    }
}

/// Access the process-wide runtime
#[inline(always)]
pub fn runtime() -> &'static Runtime {
    &RUNTIME
}

/// Apply `config` to the process-wide runtime and return it
///
/// Safe to call more than once; the last call wins. Call it before any
/// thread starts using the primitives that should be intercepted.
pub fn init(config: ShimConfig) -> &'static Runtime {
    let rt = runtime();
    rt.set_deadline_precision(config.deadline_precision);
    info!(
        start_enabled = config.start_enabled,
        precision = ?config.deadline_precision,
        "lockshim runtime initialized"
    );
    rt.control(config.start_enabled);
    rt
}
