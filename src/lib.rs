/*!
 * Pressure Responder Library
 * CPU boost arbitration and low-memory reclaim exposed as a library
 */

pub mod boost;
pub mod core;
pub mod deferred;
pub mod monitoring;
pub mod platform;
pub mod reclaim;

// Re-exports
pub use boost::{BoostArbiter, BoostCollaborators, BoostFlags, BoostHandle};
pub use self::core::clock::{Clock, ManualClock, MonotonicClock};
pub use self::core::config::{BoostTunables, ReclaimConfig, ResponderConfig, WorkerConfig};
pub use self::core::errors::*;
pub use deferred::{CancelOutcome, DeferredPool, DelayedTask};
pub use monitoring::{init_tracing, ResponderStats};
pub use platform::{Platform, PlatformKind};
pub use reclaim::{PressureMonitor, ReclaimOutcome, Reclaimer, ReclaimerDeps};
