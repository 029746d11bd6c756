/*!
 * Interposition Layer
 *
 * Routes intercepted pthread and process-exit calls either to the
 * plugged-in strategy or to the original implementation:
 *
 * - `dispatch`: one function per primitive, generic over strategy and
 *   mechanism
 * - `lifecycle`: exit guard
 * - `native`, `next_symbol`, `direct`: reaching the originals
 * - `macros`: the [`interpose!`](crate::interpose!) symbol generator
 */

pub mod dispatch;
pub mod lifecycle;
mod macros;
mod native;

mod direct;
mod next_symbol;

pub use direct::{DirectCall, InterposeEntry};
pub use native::{mechanism, AtExitHook, Mechanism, Native, NativeSync};
pub use next_symbol::{NextSymbol, SymbolSlot};
