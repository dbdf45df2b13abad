/*!
 * Scan and Kill
 *
 * One walk of the process table restricted to a kill-priority tier. The walk
 * tolerates processes exiting or appearing while it runs: a failed signal
 * simply skips the candidate.
 */

use super::traits::ProcessTable;
use super::types::{ProcessRecord, ScanResult, TierBounds, Victim};
use crate::core::limits::MIN_VICTIM_PAGES;
use crate::core::types::{Pages, Pid};
use tracing::{debug, warn};

/// Whether `record` may be signaled in `tier` by the process `self_pid`
pub fn is_candidate(record: &ProcessRecord, tier: TierBounds, self_pid: Pid) -> bool {
    if record.pid == self_pid || record.kernel_thread {
        return false;
    }
    if record.kill_sent || record.dying {
        return false;
    }
    if !tier.contains(record.oom_score_adj) {
        return false;
    }
    record.rss_pages >= MIN_VICTIM_PAGES
}

/// Signal processes in `tier` until at least `pages_needed` resident pages
/// have been freed or the tier is exhausted.
pub fn scan_and_kill(table: &dyn ProcessTable, tier: TierBounds, pages_needed: Pages) -> ScanResult {
    let mut result = ScanResult::default();

    let processes = match table.processes() {
        Ok(processes) => processes,
        Err(e) => {
            warn!(error = %e, "Process table unavailable, skipping tier");
            return result;
        }
    };
    let self_pid = table.current_pid();

    for record in processes
        .into_iter()
        .filter(|r| is_candidate(r, tier, self_pid))
    {
        if let Err(e) = table.send_kill(record.pid) {
            debug!(pid = record.pid, error = %e, "Kill failed, skipping victim");
            result.signal_failures += 1;
            continue;
        }
        table.mark_kill_sent(record.pid);

        if let Err(e) = table.boost_victim(record.pid) {
            debug!(pid = record.pid, error = %e, "Could not raise victim priority");
        }

        debug!(
            pid = record.pid,
            name = %record.name,
            adj = record.oom_score_adj,
            rss_pages = record.rss_pages,
            "Killed process"
        );
        result.pages_freed += record.rss_pages;
        result.victims.push(Victim {
            pid: record.pid,
            name: record.name,
            rss_pages: record.rss_pages,
            oom_score_adj: record.oom_score_adj,
        });

        if result.pages_freed >= pages_needed {
            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulation::SimProcessTable;

    const CACHED: TierBounds = TierBounds {
        min_adj: 900,
        max_adj: 906,
    };

    #[test]
    fn test_skips_ineligible_processes() {
        let mut signaled = ProcessRecord::new(12, "signaled", 905, 10);
        signaled.kill_sent = true;
        let mut dying = ProcessRecord::new(13, "dying", 905, 10);
        dying.dying = true;

        let table = SimProcessTable::new(vec![
            ProcessRecord::new(1, "self", 906, 10),
            ProcessRecord::new(2, "kworker", 906, 10).kernel_thread(),
            signaled,
            dying,
            ProcessRecord::new(14, "empty", 906, 0),
            ProcessRecord::new(15, "visible", 100, 10),
            ProcessRecord::new(16, "cached", 901, 10),
        ])
        .with_self_pid(1);

        let result = scan_and_kill(&table, CACHED, 1_000);
        assert_eq!(table.killed(), vec![16]);
        assert_eq!(result.pages_freed, 10);
        assert!(table.was_boosted(16));
    }

    #[test]
    fn test_stops_once_need_is_met() {
        let table = SimProcessTable::new(vec![
            ProcessRecord::new(10, "a", 906, 40),
            ProcessRecord::new(11, "b", 906, 40),
            ProcessRecord::new(12, "c", 906, 40),
        ]);

        let result = scan_and_kill(&table, CACHED, 50);
        assert_eq!(result.pages_freed, 80);
        assert_eq!(result.victims.len(), 2);
        assert!(!table.record(12).unwrap().kill_sent);
    }

    #[test]
    fn test_signal_failure_skips_without_retry() {
        let table = SimProcessTable::new(vec![
            ProcessRecord::new(10, "gone", 906, 40),
            ProcessRecord::new(11, "b", 906, 40),
        ]);
        table.fail_kill(10, "ESRCH");

        let result = scan_and_kill(&table, CACHED, 80);
        assert_eq!(result.signal_failures, 1);
        assert_eq!(result.pages_freed, 40);
        assert!(!table.record(10).unwrap().kill_sent);
    }
}
