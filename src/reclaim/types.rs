/*!
 * Reclaim Types
 */

use crate::core::types::{Millis, OomScoreAdj, Pages, Pid};
use serde::{Deserialize, Serialize};

/// One live process as reported by the process table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub name: String,
    /// Resident set size
    pub rss_pages: Pages,
    /// Kill priority; higher is killed first
    pub oom_score_adj: OomScoreAdj,
    pub kernel_thread: bool,
    /// Termination already requested by a previous pass
    pub kill_sent: bool,
    /// Already exiting (zombie or out-of-memory victim)
    pub dying: bool,
}

impl ProcessRecord {
    pub fn new(pid: Pid, name: &str, oom_score_adj: OomScoreAdj, rss_pages: Pages) -> Self {
        Self {
            pid,
            name: name.to_string(),
            rss_pages,
            oom_score_adj,
            kernel_thread: false,
            kill_sent: false,
            dying: false,
        }
    }

    pub fn kernel_thread(mut self) -> Self {
        self.kernel_thread = true;
        self
    }
}

/// Inclusive kill-priority bounds of one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBounds {
    pub min_adj: OomScoreAdj,
    pub max_adj: OomScoreAdj,
}

impl TierBounds {
    #[inline]
    pub fn contains(&self, adj: OomScoreAdj) -> bool {
        adj >= self.min_adj && adj <= self.max_adj
    }
}

/// A process that was signaled during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victim {
    pub pid: Pid,
    pub name: String,
    pub rss_pages: Pages,
    pub oom_score_adj: OomScoreAdj,
}

/// Result of scanning one tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub pages_freed: Pages,
    pub victims: Vec<Victim>,
    pub signal_failures: usize,
}

/// State of one scan/kill pass, owned by the reclaimer while its lock is held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimSession {
    pub pages_needed: Pages,
    pub pages_freed: Pages,
    pub tier: Option<TierBounds>,
    pub victims: Vec<Victim>,
}

impl ReclaimSession {
    pub fn new(pages_needed: Pages) -> Self {
        Self {
            pages_needed,
            pages_freed: 0,
            tier: None,
            victims: Vec::new(),
        }
    }

    #[inline]
    pub fn remaining(&self) -> Pages {
        self.pages_needed.saturating_sub(self.pages_freed)
    }

    #[inline]
    pub fn satisfied(&self) -> bool {
        self.pages_freed >= self.pages_needed
    }

    pub fn absorb(&mut self, result: ScanResult) {
        self.pages_freed += result.pages_freed;
        self.victims.extend(result.victims);
    }
}

/// Which entry point started a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimTrigger {
    /// Periodic safety net
    Periodic,
    /// Synchronous memory-pressure signal
    Pressure,
}

impl ReclaimTrigger {
    /// Log prefix for freed-memory messages
    pub fn label(self) -> &'static str {
        match self {
            ReclaimTrigger::Periodic => "kswapd",
            ReclaimTrigger::Pressure => "oom",
        }
    }
}

/// Summary of a completed pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    pub pages_needed: Pages,
    pub pages_freed: Pages,
    pub mib_freed: u64,
    pub victims: Vec<Victim>,
    pub completed_at_ms: Millis,
}

/// What a reclaim request ended up doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReclaimOutcome {
    /// Reclaimer not armed yet
    Disabled,
    /// Another pass held the lock; request dropped
    Contended,
    /// Minimum interval since the last pass has not elapsed
    Throttled,
    Reclaimed(ReclaimReport),
}

impl ReclaimOutcome {
    pub fn report(&self) -> Option<&ReclaimReport> {
        match self {
            ReclaimOutcome::Reclaimed(report) => Some(report),
            _ => None,
        }
    }

    pub fn ran(&self) -> bool {
        matches!(self, ReclaimOutcome::Reclaimed(_))
    }
}
