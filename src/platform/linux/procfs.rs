/*!
 * Procfs Process Table
 *
 * Walks `/proc/<pid>` for kill-priority scores and resident sizes and
 * delivers SIGKILL through `nix`. Entries that vanish or fail to parse while
 * the walk runs are skipped.
 */

use crate::core::errors::{PlatformError, ReclaimError};
use crate::core::limits::{FALLBACK_PAGE_SIZE, VICTIM_RT_PRIO};
use crate::core::types::{OomScoreAdj, Pages, Pid};
use crate::platform::sched::set_fifo_priority;
use crate::reclaim::traits::ProcessTable;
use crate::reclaim::types::ProcessRecord;
use ahash::RandomState;
use dashmap::{DashMap, DashSet};
use log::{debug, trace};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROC_ROOT: &str = "/proc";

/// Task flag of kernel threads in `/proc/<pid>/stat`
const PF_KTHREAD: u64 = 0x0020_0000;

/// Fields of `/proc/<pid>/stat` the reclaimer cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    pub comm: String,
    pub state: char,
    pub flags: u64,
    /// Clock ticks after boot at which the process started
    pub starttime: u64,
}

impl StatLine {
    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }

    /// Zombie or dead
    pub fn is_exiting(&self) -> bool {
        matches!(self.state, 'Z' | 'X' | 'x')
    }
}

/// Parse a stat line; `comm` may contain spaces and parentheses, so the
/// fields are located after the last `)`.
pub fn parse_stat(raw: &str) -> Option<StatLine> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    if close < open {
        return None;
    }
    let comm = raw[open + 1..close].to_string();

    let mut fields = raw[close + 1..].split_whitespace();
    let state = fields.next()?.chars().next()?;
    // ppid, pgrp, session, tty_nr, tpgid precede flags
    let flags = fields.nth(5)?.parse().ok()?;
    // Fault counters, cpu times, priority, nice, threads and itrealvalue precede starttime
    let starttime = fields.nth(12)?.parse().ok()?;
    Some(StatLine {
        comm,
        state,
        flags,
        starttime,
    })
}

/// Resident pages from `/proc/<pid>/statm`
pub fn parse_statm_resident(raw: &str) -> Option<Pages> {
    raw.split_whitespace().nth(1)?.parse().ok()
}

pub struct ProcfsProcessTable {
    root: PathBuf,
    page_size: u64,
    self_pid: Pid,
    /// Processes already sent SIGKILL, keyed by (pid, starttime) so a reused
    /// pid is not mistaken for its killed predecessor
    signaled: DashSet<(Pid, u64), RandomState>,
    /// Start times seen by the latest walk
    starttimes: DashMap<Pid, u64, RandomState>,
}

impl ProcfsProcessTable {
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: system_page_size(),
            self_pid: std::process::id() as Pid,
            signaled: DashSet::with_hasher(RandomState::new()),
            starttimes: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.root.join("self").join("stat").exists()
    }

    fn read_record(&self, pid: Pid, dir: &Path) -> Option<(ProcessRecord, u64)> {
        let stat = parse_stat(&fs::read_to_string(dir.join("stat")).ok()?)?;
        let kernel_thread = stat.is_kernel_thread();

        // Kernel threads have no address space; statm reads as zeros
        let rss_pages = parse_statm_resident(&fs::read_to_string(dir.join("statm")).ok()?)?;
        let oom_score_adj: OomScoreAdj = fs::read_to_string(dir.join("oom_score_adj"))
            .ok()?
            .trim()
            .parse()
            .ok()?;

        let record = ProcessRecord {
            pid,
            name: stat.comm.clone(),
            rss_pages,
            oom_score_adj,
            kernel_thread,
            kill_sent: self.signaled.contains(&(pid, stat.starttime)),
            dying: stat.is_exiting(),
        };
        Some((record, stat.starttime))
    }
}

impl Default for ProcfsProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn system_page_size() -> u64 {
    // SAFETY: sysconf has no memory-safety preconditions
    let size = unsafe { nix::libc::sysconf(nix::libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        FALLBACK_PAGE_SIZE
    }
}

impl ProcessTable for ProcfsProcessTable {
    fn processes(&self) -> Result<Vec<ProcessRecord>, ReclaimError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            ReclaimError::ProcessTable(format!("{}: {}", self.root.display(), e))
        })?;

        let mut records = Vec::new();
        let mut live = ahash::AHashSet::new();
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<Pid>().ok())
            else {
                continue;
            };
            match self.read_record(pid, &entry.path()) {
                Some((record, starttime)) => {
                    live.insert((pid, starttime));
                    records.push(record);
                }
                None => trace!("PID {} vanished during scan", pid),
            }
        }

        self.signaled.retain(|key| live.contains(key));
        self.starttimes.clear();
        for &(pid, starttime) in &live {
            self.starttimes.insert(pid, starttime);
        }
        Ok(records)
    }

    fn current_pid(&self) -> Pid {
        self.self_pid
    }

    fn send_kill(&self, pid: Pid) -> Result<(), ReclaimError> {
        kill(NixPid::from_raw(pid), Signal::SIGKILL).map_err(|e| ReclaimError::SignalDelivery {
            pid,
            reason: e.to_string(),
        })
    }

    fn mark_kill_sent(&self, pid: Pid) {
        match self.starttimes.get(&pid).map(|entry| *entry.value()) {
            Some(starttime) => {
                self.signaled.insert((pid, starttime));
            }
            None => trace!("PID {} not seen by the last walk, not marked", pid),
        }
    }

    fn boost_victim(&self, pid: Pid) -> Result<(), PlatformError> {
        set_fifo_priority(pid, VICTIM_RT_PRIO).map_err(|e| {
            debug!("Victim {} keeps its priority: {}", pid, e);
            e
        })
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}
