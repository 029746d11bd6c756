/*!
 * Reference Lock Strategies
 *
 * Ready-made [`LockStrategy`](crate::sync::LockStrategy) implementations.
 * They only use the public contract; embedding programs are free to bring
 * their own algorithm instead.
 *
 * - [`CasLock`]: compare-and-swap spinlock, smallest footprint
 * - [`TicketLock`]: FIFO-fair ticket lock
 * - [`McsLock`]: MCS queue serialising contenders onto an ownership bit
 */

mod backoff;
mod caslock;
mod mcs;
mod ticket;

pub use backoff::Backoff;
pub use caslock::CasLock;
pub use mcs::McsLock;
pub use ticket::TicketLock;
