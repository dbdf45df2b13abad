/*!
 * Reclaim Traits
 * Process-table and memory-source contracts used by the reclaimer
 */

use super::types::ProcessRecord;
use crate::core::errors::{PlatformError, ReclaimError};
use crate::core::types::Pid;

/// Live process table with termination control
pub trait ProcessTable: Send + Sync {
    /// Current processes; the list may be stale by the time it is used
    fn processes(&self) -> Result<Vec<ProcessRecord>, ReclaimError>;

    /// PID of the reclaimer's own process, never a victim
    fn current_pid(&self) -> Pid;

    /// Request termination (SIGKILL)
    fn send_kill(&self, pid: Pid) -> Result<(), ReclaimError>;

    /// Remember that termination was requested so later scans skip it
    fn mark_kill_sent(&self, pid: Pid);

    /// Raise the victim's scheduling priority so it exits faster
    fn boost_victim(&self, pid: Pid) -> Result<(), PlatformError>;

    fn page_size(&self) -> u64;
}

/// Source of the current free-memory figure
pub trait MemorySource: Send + Sync {
    /// Memory available without reclaim, in MiB
    fn available_mib(&self) -> Result<u64, PlatformError>;
}
