/*!
 * Exit Guard
 *
 * Destructors and `atexit` hooks run after `exit` may use any mutex in the
 * process, including ones a strategy no longer vouches for. Interception is
 * therefore switched off before the real exit sequence starts, and every
 * teardown-time call reaches the original primitives.
 */

use super::native::{AtExitHook, NativeSync};
use crate::runtime::runtime;
use libc::c_int;
use tracing::info;

/// Switch interception off ahead of process teardown
///
/// Called by the exported `exit`. Programs that leave through another path
/// (returning from `main`, `_exit` after manual cleanup) can call it
/// directly.
pub fn prepare_exit() {
    let rt = runtime();
    let was_enabled = rt.is_enabled();
    rt.disable();
    if was_enabled {
        info!("interception disabled for process exit");
    }
}

/// Guarded `exit`
///
/// # Safety
///
/// Same as `exit(3)`: terminates the process, running registered hooks.
pub unsafe fn exit<N: NativeSync>(status: c_int) -> ! {
    prepare_exit();
    N::exit(status)
}

/// Guarded `atexit`
///
/// Registration takes locks of its own inside the C library, so it runs
/// with interception off. The switch is turned back on afterwards.
///
/// # Safety
///
/// Same as `atexit(3)`.
pub unsafe fn atexit<N: NativeSync>(hook: AtExitHook) -> c_int {
    let rt = runtime();
    rt.store_quiet(false);
    let rc = N::atexit(hook);
    rt.store_quiet(true);
    rc
}
