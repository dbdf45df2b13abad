/*!
 * Deferred Task Scheduler
 *
 * Delay-fired, cancelable units of work on a general-purpose timer pool.
 * Used for "unboost after N ms" and the periodic reclaim cadence.
 */

pub mod pool;
pub mod task;
pub mod types;

pub use pool::DeferredPool;
pub use task::DelayedTask;
pub use types::{CancelOutcome, TaskStatus};
