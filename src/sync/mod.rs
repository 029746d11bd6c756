/*!
 * Synchronization Core
 *
 * The pieces the dispatcher is built from:
 * - `LockStrategy`: the capability contract of a pluggable lock
 * - `storage`: size-checked views of native handle memory
 * - `GenerationCond`: spin-based condition variable on one atomic counter
 * - `Deadline`: realtime deadlines for timed waits
 */

mod condvar;
mod deadline;
pub mod storage;
mod traits;

pub use condvar::{GenerationCond, WaitError, WaitResult};
pub use deadline::{Deadline, Timestamp};
pub use traits::{LockStrategy, Relock, StrategyRelock};
