/*!
 * Reclaim Module
 *
 * Low-memory reclaimer:
 * - Priority-tiered scan/kill over the process table
 * - Periodic safety-net and synchronous pressure entry points, each throttled
 * - Non-blocking drop of contended pressure requests
 * - Max-frequency boost requested for the duration of each pass
 */

pub mod monitor;
pub mod reclaimer;
pub mod scan;
pub mod stats;
pub mod throttle;
pub mod tiers;
pub mod traits;
pub mod types;

pub use monitor::{MonitorCommand, PressureMonitor};
pub use reclaimer::{Reclaimer, ReclaimerDeps};
pub use scan::scan_and_kill;
pub use stats::{AtomicReclaimStats, ReclaimStats};
pub use throttle::ReclaimThrottle;
pub use tiers::tiers;
pub use traits::{MemorySource, ProcessTable};
pub use types::*;
