/*!
 * Scheduler Control
 * Best-effort CPU affinity and real-time priority for threads and processes
 */

use crate::core::errors::PlatformError;
use crate::core::types::{CpuId, Pid};

#[cfg(target_os = "linux")]
use nix::sched::{sched_setaffinity, CpuSet};
#[cfg(target_os = "linux")]
use nix::unistd::Pid as NixPid;

/// Pin the calling thread to `cpus`
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpus: &[CpuId]) -> Result<(), PlatformError> {
    let mut set = CpuSet::new();
    for &cpu in cpus {
        set.set(cpu as usize)
            .map_err(|e| PlatformError::Unsupported(format!("cpu {}: {}", cpu, e)))?;
    }
    sched_setaffinity(NixPid::from_raw(0), &set)
        .map_err(|e| PlatformError::Unsupported(format!("sched_setaffinity: {}", e)))
}

/// Move `pid` (0 = calling thread) to SCHED_FIFO at `priority`
#[cfg(target_os = "linux")]
pub fn set_fifo_priority(pid: Pid, priority: i32) -> Result<(), PlatformError> {
    use nix::libc;

    // SAFETY: sched_param is plain data; zeroing covers any padding fields
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = priority;

    // SAFETY: param is a valid, initialized sched_param for the duration of the call
    let ret = unsafe { libc::sched_setscheduler(pid, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        return Err(PlatformError::Unsupported(format!(
            "sched_setscheduler(pid {}, prio {}): {}",
            pid,
            priority,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(cpus: &[CpuId]) -> Result<(), PlatformError> {
    Err(PlatformError::Unsupported(format!(
        "CPU affinity ({} cpus) not supported on this platform",
        cpus.len()
    )))
}

#[cfg(not(target_os = "linux"))]
pub fn set_fifo_priority(pid: Pid, priority: i32) -> Result<(), PlatformError> {
    Err(PlatformError::Unsupported(format!(
        "SCHED_FIFO (pid {}, prio {}) not supported on this platform",
        pid, priority
    )))
}
