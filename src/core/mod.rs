/*!
 * Core Module
 * Fundamental types, constants, configuration and error handling
 */

pub mod clock;
pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use clock::{time_after, time_after_eq, Clock, ManualClock, MonotonicClock};
pub use config::{BoostTunables, ReclaimConfig, ResponderConfig, WorkerConfig};
pub use errors::*;
pub use types::*;
