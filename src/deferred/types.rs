/*!
 * Deferred Task Types
 */

use serde::{Deserialize, Serialize};

/// Result of a synchronous cancellation.
///
/// Reports whether a fire was still pending when the cancel took effect, after
/// any in-flight firing has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// A pending fire was removed before it ran
    WasPending,
    /// Nothing was pending
    WasIdle,
}

impl CancelOutcome {
    #[inline]
    pub fn was_pending(self) -> bool {
        matches!(self, CancelOutcome::WasPending)
    }

    #[inline]
    pub fn was_idle(self) -> bool {
        matches!(self, CancelOutcome::WasIdle)
    }
}

/// Point-in-time view of a task, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    pub pending: bool,
    pub running: bool,
    pub fired: u64,
}
