/*!
 * Low-Memory Reclaimer
 *
 * Frees memory by killing processes tier by tier, most disposable first.
 *
 * # Entry points
 * - `force_reclaim`: synchronous pressure path; drops the request when a pass
 *   is already running and honours the short throttle interval
 * - periodic pass: safety net on the deferred pool; waits for the pass lock,
 *   honours the long interval and always re-arms
 *
 * Both are no-ops until `enable` arms the reclaimer, which happens once.
 */

use super::scan::scan_and_kill;
use super::stats::{AtomicReclaimStats, ReclaimStats};
use super::throttle::ReclaimThrottle;
use super::tiers::tiers;
use super::traits::ProcessTable;
use super::types::{ReclaimOutcome, ReclaimReport, ReclaimSession, ReclaimTrigger};
use crate::boost::handle::BoostHandle;
use crate::boost::traits::BusBoost;
use crate::core::clock::Clock;
use crate::core::config::ReclaimConfig;
use crate::core::types::{mib_to_pages, pages_to_mib, Pages};
use crate::deferred::{DeferredPool, DelayedTask};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Collaborators the reclaimer acts through
#[derive(Clone)]
pub struct ReclaimerDeps {
    pub processes: Arc<dyn ProcessTable>,
    pub boost: BoostHandle,
    pub bus: Option<Arc<dyn BusBoost>>,
    pub clock: Arc<dyn Clock>,
}

struct ReclaimerInner {
    config: ReclaimConfig,
    deps: ReclaimerDeps,
    /// Pages a pass tries to free; set exactly once by `enable`
    minfree_pages: OnceLock<Pages>,
    /// Pass lock; at most one scan/kill pass runs at a time
    throttle: Mutex<ReclaimThrottle>,
    periodic: DelayedTask,
    periodic_armed: AtomicBool,
    stats: AtomicReclaimStats,
}

impl ReclaimerInner {
    fn is_enabled(&self) -> bool {
        self.minfree_pages.get().is_some()
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.config.periodic_interval_ms)
    }

    fn periodic_work(&self, task: &DelayedTask) {
        let outcome = self.run(ReclaimTrigger::Periodic, false);
        trace!(?outcome, "Periodic reclaim tick");

        if self.periodic_armed.load(Ordering::Acquire) {
            task.queue(self.periodic_interval());
        }
    }

    fn run(&self, trigger: ReclaimTrigger, try_only: bool) -> ReclaimOutcome {
        let Some(&pages_needed) = self.minfree_pages.get() else {
            self.stats.inc_disabled();
            return ReclaimOutcome::Disabled;
        };

        let mut throttle = if try_only {
            match self.throttle.try_lock() {
                Some(guard) => guard,
                None => {
                    self.stats.inc_contended();
                    trace!("Reclaim already in progress, dropping request");
                    return ReclaimOutcome::Contended;
                }
            }
        } else {
            self.throttle.lock()
        };

        if !throttle.allows(trigger, self.deps.clock.now_ms()) {
            self.stats.inc_throttled();
            trace!(trigger = trigger.label(), "Reclaim throttled");
            return ReclaimOutcome::Throttled;
        }

        match trigger {
            ReclaimTrigger::Periodic => self.stats.inc_periodic_passes(),
            ReclaimTrigger::Pressure => self.stats.inc_pressure_passes(),
        }
        let report = self.do_lmk_reclaim(&mut throttle, pages_needed);
        drop(throttle);

        if report.mib_freed > 0 {
            info!(
                pages_freed = report.pages_freed,
                victims = report.victims.len(),
                "{}: freed {} MiB",
                trigger.label(),
                report.mib_freed
            );
        }
        ReclaimOutcome::Reclaimed(report)
    }

    /// One full pass over the tiers; `throttle` is the held pass lock
    fn do_lmk_reclaim(&self, throttle: &mut ReclaimThrottle, pages_needed: Pages) -> ReclaimReport {
        let boost_ms = self.config.boost_duration_ms;
        self.deps.boost.kick_max(boost_ms);
        if let Some(bus) = &self.deps.bus {
            bus.kick_max(boost_ms);
        }

        let mut session = ReclaimSession::new(pages_needed);
        for tier in tiers() {
            if session.satisfied() {
                break;
            }
            session.tier = Some(tier);
            let result = scan_and_kill(self.deps.processes.as_ref(), tier, session.remaining());
            self.stats.add_victims(result.victims.len() as u64);
            self.stats.add_signal_failures(result.signal_failures as u64);
            session.absorb(result);
        }
        self.stats.add_pages_freed(session.pages_freed);

        let completed_at_ms = self.deps.clock.now_ms();
        throttle.record(completed_at_ms);

        let page_size = self.deps.processes.page_size();
        debug!(
            pages_needed,
            pages_freed = session.pages_freed,
            last_tier = ?session.tier,
            "Reclaim pass finished"
        );
        ReclaimReport {
            pages_needed,
            pages_freed: session.pages_freed,
            mib_freed: pages_to_mib(session.pages_freed, page_size),
            victims: session.victims,
            completed_at_ms,
        }
    }
}

/// Low-memory reclaimer handle
pub struct Reclaimer {
    inner: Arc<ReclaimerInner>,
}

impl Reclaimer {
    /// Build a disabled reclaimer; nothing runs until `enable`
    pub fn new(config: ReclaimConfig, deps: ReclaimerDeps, pool: &DeferredPool) -> Self {
        let throttle = ReclaimThrottle::new(config.periodic_interval_ms, config.pressure_interval_ms);
        let inner = Arc::new_cyclic(|weak: &Weak<ReclaimerInner>| {
            let periodic_inner = weak.clone();
            let periodic = DelayedTask::new(pool, "lmk-periodic", move |task| {
                if let Some(inner) = periodic_inner.upgrade() {
                    inner.periodic_work(task);
                }
            });

            ReclaimerInner {
                config,
                deps,
                minfree_pages: OnceLock::new(),
                throttle: Mutex::new(throttle),
                periodic,
                periodic_armed: AtomicBool::new(false),
                stats: AtomicReclaimStats::new(),
            }
        });
        Self { inner }
    }

    /// Arm the reclaimer with its free-memory target.
    ///
    /// Only the first call with a non-zero target has an effect; it returns `true`.
    pub fn enable(&self, minfree_mib: u64) -> bool {
        let pages = mib_to_pages(minfree_mib, self.inner.deps.processes.page_size());
        if pages == 0 {
            warn!(minfree_mib, "Ignoring zero minfree, reclaimer stays disabled");
            return false;
        }
        let armed = self.inner.minfree_pages.set(pages).is_ok();
        if armed {
            info!(minfree_mib, minfree_pages = pages, "Low-memory reclaimer enabled");
        }
        armed
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    pub fn minfree_pages(&self) -> Option<Pages> {
        self.inner.minfree_pages.get().copied()
    }

    /// Synchronous reclaim under memory pressure. Never blocks on another pass.
    pub fn force_reclaim(&self) -> ReclaimOutcome {
        self.inner.run(ReclaimTrigger::Pressure, true)
    }

    /// Unthrottled pass freeing at least `pages_needed` if possible.
    ///
    /// Waits for the pass lock and records the completion time, so the
    /// throttled entry points see it as their last pass.
    pub fn do_lmk_reclaim(&self, pages_needed: Pages) -> ReclaimReport {
        let mut throttle = self.inner.throttle.lock();
        self.inner.do_lmk_reclaim(&mut throttle, pages_needed)
    }

    /// Run one periodic pass inline, waiting for the pass lock
    pub fn periodic_reclaim(&self) -> ReclaimOutcome {
        self.inner.run(ReclaimTrigger::Periodic, false)
    }

    /// Arm the periodic safety net; first pass after one interval
    pub fn start_periodic(&self) -> bool {
        if !self.inner.is_enabled() {
            return false;
        }
        self.inner.periodic_armed.store(true, Ordering::Release);
        let queued = self.inner.periodic.queue(self.inner.periodic_interval());
        if queued {
            debug!(
                interval_ms = self.inner.config.periodic_interval_ms,
                "Periodic reclaim started"
            );
        }
        queued
    }

    /// Disarm the periodic safety net and wait for a running pass to finish
    pub fn stop_periodic(&self) {
        if !self.inner.is_enabled() {
            return;
        }
        self.inner.periodic_armed.store(false, Ordering::Release);
        if self.inner.periodic.cancel_sync().was_pending() {
            debug!("Periodic reclaim stopped");
        }
    }

    pub fn is_periodic_pending(&self) -> bool {
        self.inner.periodic.is_pending()
    }

    pub fn last_reclaim_ms(&self) -> Option<u64> {
        self.inner.throttle.lock().last_reclaim_ms()
    }

    pub fn config(&self) -> &ReclaimConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> ReclaimStats {
        self.inner.stats.snapshot()
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop_periodic();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::platform::simulation::{SimBusBoost, SimProcessTable};
    use crate::reclaim::types::ProcessRecord;

    fn reclaimer(
        table: Arc<SimProcessTable>,
        clock: Arc<ManualClock>,
        pool: &DeferredPool,
    ) -> (Reclaimer, Arc<SimBusBoost>) {
        let bus = Arc::new(SimBusBoost::new());
        let deps = ReclaimerDeps {
            processes: table,
            boost: BoostHandle::disabled(),
            bus: Some(bus.clone()),
            clock,
        };
        (Reclaimer::new(ReclaimConfig::default(), deps, pool), bus)
    }

    #[test]
    fn test_disabled_until_enabled_once() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let table = Arc::new(SimProcessTable::new(vec![ProcessRecord::new(
            10, "cached", 906, 50,
        )]));
        let (reclaimer, _) = reclaimer(table.clone(), Arc::new(ManualClock::new(1)), &pool);

        assert_eq!(reclaimer.force_reclaim(), ReclaimOutcome::Disabled);
        assert!(!reclaimer.start_periodic());
        assert!(table.killed().is_empty());

        assert!(reclaimer.enable(100));
        assert!(!reclaimer.enable(50));
        assert_eq!(reclaimer.minfree_pages(), Some(25_600));
    }

    #[test]
    fn test_zero_minfree_does_not_arm() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let table = Arc::new(SimProcessTable::new(vec![ProcessRecord::new(
            10, "cached", 906, 50,
        )]));
        let (reclaimer, _) = reclaimer(table.clone(), Arc::new(ManualClock::new(1)), &pool);

        assert!(!reclaimer.enable(0));
        assert!(!reclaimer.is_enabled());
        assert_eq!(reclaimer.force_reclaim(), ReclaimOutcome::Disabled);
        assert_eq!(reclaimer.last_reclaim_ms(), None);

        // A real target can still arm it afterwards
        assert!(reclaimer.enable(1));
        assert!(reclaimer.force_reclaim().ran());
        assert_eq!(table.killed(), vec![10]);
    }

    #[test]
    fn test_pass_kicks_bus_and_records_time() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let table = Arc::new(SimProcessTable::new(vec![ProcessRecord::new(
            10, "cached", 906, 50,
        )]));
        let clock = Arc::new(ManualClock::new(42));
        let (reclaimer, bus) = reclaimer(table, clock, &pool);
        reclaimer.enable(1);

        let outcome = reclaimer.force_reclaim();
        let report = outcome.report().unwrap();
        assert_eq!(report.pages_freed, 50);
        assert_eq!(report.completed_at_ms, 42);
        assert_eq!(bus.kicks(), 1);
        assert_eq!(bus.last_duration_ms(), 250);
        assert_eq!(reclaimer.last_reclaim_ms(), Some(42));
    }

    #[test]
    fn test_pressure_throttled_within_interval() {
        let pool = DeferredPool::new("test", 1).unwrap();
        let table = Arc::new(SimProcessTable::new(Vec::new()));
        let clock = Arc::new(ManualClock::new(1_000));
        let (reclaimer, _) = reclaimer(table, clock.clone(), &pool);
        reclaimer.enable(1);

        assert!(reclaimer.force_reclaim().ran());
        clock.advance(999);
        assert_eq!(reclaimer.force_reclaim(), ReclaimOutcome::Throttled);
        clock.advance(1);
        assert!(reclaimer.force_reclaim().ran());
        assert_eq!(reclaimer.stats().throttled, 1);
    }
}
