/*!
 * Simulated Platform
 *
 * In-memory governor, process table, memory source and bus booster.
 * Used by the daemon outside Linux and by the test suites.
 */

use super::registry::Registry;
use crate::boost::traits::{BusBoost, FrequencyGovernor, PolicyHook};
use crate::boost::types::{CpuPolicy, NotifyAction, RegistrationId};
use crate::core::errors::{PlatformError, ReclaimError};
use crate::core::limits::FALLBACK_PAGE_SIZE;
use crate::core::types::{CpuId, FreqKhz, Millis, Pid};
use crate::reclaim::traits::{MemorySource, ProcessTable};
use crate::reclaim::types::ProcessRecord;
use ahash::RandomState;
use dashmap::{DashMap, DashSet};
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Frequency governor over a fixed set of simulated CPUs
pub struct SimGovernor {
    policies: RwLock<BTreeMap<CpuId, CpuPolicy>>,
    online: RwLock<Vec<CpuId>>,
    hooks: Registry<dyn PolicyHook>,
    updates: AtomicU64,
    update_lock: Mutex<()>,
}

impl SimGovernor {
    /// Build from `(cpu, absolute_min, ceiling)` triples; all CPUs start online
    pub fn new(cpus: &[(CpuId, FreqKhz, FreqKhz)]) -> Self {
        let policies = cpus
            .iter()
            .map(|&(cpu, min, max)| (cpu, CpuPolicy::new(cpu, min, max)))
            .collect::<BTreeMap<_, _>>();
        let online = policies.keys().copied().collect();
        Self {
            policies: RwLock::new(policies),
            online: RwLock::new(online),
            hooks: Registry::new("policy notifier"),
            updates: AtomicU64::new(0),
            update_lock: Mutex::new(()),
        }
    }

    /// Big.LITTLE layout: CPUs 0-3 low-power, 4-7 high-performance
    pub fn octa_core() -> Self {
        let mut cpus = Vec::with_capacity(8);
        for cpu in 0..4 {
            cpus.push((cpu, 300_000, 1_766_400));
        }
        for cpu in 4..8 {
            cpus.push((cpu, 300_000, 2_803_200));
        }
        Self::new(&cpus)
    }

    pub fn policy(&self, cpu: CpuId) -> Option<CpuPolicy> {
        self.policies.read().get(&cpu).copied()
    }

    /// Current floor, or `None` for an unknown CPU
    pub fn floor(&self, cpu: CpuId) -> Option<FreqKhz> {
        self.policy(cpu).map(|p| p.floor)
    }

    /// Take a CPU offline or bring it back
    pub fn set_online(&self, cpu: CpuId, online: bool) {
        let mut set = self.online.write();
        set.retain(|&c| c != cpu);
        if online && self.policies.read().contains_key(&cpu) {
            set.push(cpu);
            set.sort_unstable();
        }
    }

    /// Total policy updates performed
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn refuse_hooks(&self, refuse: bool) {
        self.hooks.set_refuse(refuse);
    }
}

impl FrequencyGovernor for SimGovernor {
    fn register_hook(&self, hook: Arc<dyn PolicyHook>) -> Result<RegistrationId, PlatformError> {
        let id = self.hooks.register(hook)?;
        debug!("Policy hook {:?} registered", id);
        Ok(id)
    }

    fn unregister_hook(&self, id: RegistrationId) {
        if self.hooks.unregister(id) {
            debug!("Policy hook {:?} unregistered", id);
        }
    }

    fn online_cpus(&self) -> Vec<CpuId> {
        self.online.read().clone()
    }

    fn update_policy(&self, cpu: CpuId) -> Result<(), PlatformError> {
        // Serialize updates so concurrent refreshes of one CPU cannot interleave
        let _guard = self.update_lock.lock();

        let mut policy = self
            .policy(cpu)
            .ok_or_else(|| PlatformError::Unsupported(format!("no policy for cpu {}", cpu)))?;
        policy.floor = policy.absolute_min;

        for hook in self.hooks.snapshot() {
            if hook.on_policy_adjust(&mut policy) == NotifyAction::Stop {
                break;
            }
        }

        policy.floor = policy.floor.clamp(policy.absolute_min, policy.ceiling);
        trace!("cpu{} floor -> {} kHz", cpu, policy.floor);
        self.policies.write().insert(cpu, policy);
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// In-memory process table
pub struct SimProcessTable {
    records: RwLock<Vec<ProcessRecord>>,
    self_pid: Pid,
    page_size: u64,
    killed: Mutex<Vec<Pid>>,
    boosted: DashSet<Pid, RandomState>,
    kill_failures: DashMap<Pid, String, RandomState>,
    /// Remove killed processes from the table, as if they exited instantly
    reap_on_kill: bool,
}

impl SimProcessTable {
    pub fn new(records: Vec<ProcessRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            self_pid: 1,
            page_size: FALLBACK_PAGE_SIZE,
            killed: Mutex::new(Vec::new()),
            boosted: DashSet::with_hasher(RandomState::new()),
            kill_failures: DashMap::with_hasher(RandomState::new()),
            reap_on_kill: false,
        }
    }

    pub fn with_self_pid(mut self, pid: Pid) -> Self {
        self.self_pid = pid;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn reap_on_kill(mut self) -> Self {
        self.reap_on_kill = true;
        self
    }

    pub fn insert(&self, record: ProcessRecord) {
        let mut records = self.records.write();
        records.retain(|r| r.pid != record.pid);
        records.push(record);
    }

    /// Make the next kills of `pid` fail with `reason`
    pub fn fail_kill(&self, pid: Pid, reason: &str) {
        self.kill_failures.insert(pid, reason.to_string());
    }

    /// PIDs signaled so far, in order
    pub fn killed(&self) -> Vec<Pid> {
        self.killed.lock().clone()
    }

    pub fn was_boosted(&self, pid: Pid) -> bool {
        self.boosted.contains(&pid)
    }

    pub fn record(&self, pid: Pid) -> Option<ProcessRecord> {
        self.records.read().iter().find(|r| r.pid == pid).cloned()
    }
}

impl ProcessTable for SimProcessTable {
    fn processes(&self) -> Result<Vec<ProcessRecord>, ReclaimError> {
        Ok(self.records.read().clone())
    }

    fn current_pid(&self) -> Pid {
        self.self_pid
    }

    fn send_kill(&self, pid: Pid) -> Result<(), ReclaimError> {
        if let Some(reason) = self.kill_failures.get(&pid) {
            return Err(ReclaimError::SignalDelivery {
                pid,
                reason: reason.value().clone(),
            });
        }
        if !self.records.read().iter().any(|r| r.pid == pid) {
            return Err(ReclaimError::SignalDelivery {
                pid,
                reason: "no such process".into(),
            });
        }
        self.killed.lock().push(pid);
        if self.reap_on_kill {
            self.records.write().retain(|r| r.pid != pid);
        }
        Ok(())
    }

    fn mark_kill_sent(&self, pid: Pid) {
        if let Some(record) = self.records.write().iter_mut().find(|r| r.pid == pid) {
            record.kill_sent = true;
        }
    }

    fn boost_victim(&self, pid: Pid) -> Result<(), PlatformError> {
        self.boosted.insert(pid);
        Ok(())
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}

/// Settable free-memory figure
pub struct SimMemory {
    available_mib: AtomicU64,
}

impl SimMemory {
    pub fn new(available_mib: u64) -> Self {
        Self {
            available_mib: AtomicU64::new(available_mib),
        }
    }

    pub fn set_available_mib(&self, mib: u64) {
        self.available_mib.store(mib, Ordering::Relaxed);
    }
}

impl MemorySource for SimMemory {
    fn available_mib(&self) -> Result<u64, PlatformError> {
        Ok(self.available_mib.load(Ordering::Relaxed))
    }
}

/// Bus booster that only records its kicks
#[derive(Default)]
pub struct SimBusBoost {
    kicks: AtomicUsize,
    last_duration_ms: AtomicU64,
}

impl SimBusBoost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kicks(&self) -> usize {
        self.kicks.load(Ordering::Relaxed)
    }

    pub fn last_duration_ms(&self) -> Millis {
        self.last_duration_ms.load(Ordering::Relaxed)
    }
}

impl BusBoost for SimBusBoost {
    fn kick_max(&self, duration_ms: Millis) {
        self.kicks.fetch_add(1, Ordering::Relaxed);
        self.last_duration_ms.store(duration_ms, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RaiseFloor(FreqKhz);

    impl PolicyHook for RaiseFloor {
        fn on_policy_adjust(&self, policy: &mut CpuPolicy) -> NotifyAction {
            policy.floor = self.0;
            NotifyAction::Continue
        }
    }

    #[test]
    fn test_update_runs_hooks_from_absolute_min() {
        let governor = SimGovernor::octa_core();
        let id = governor
            .register_hook(Arc::new(RaiseFloor(1_000_000)))
            .unwrap();

        governor.update_policy(2).unwrap();
        assert_eq!(governor.floor(2), Some(1_000_000));

        governor.unregister_hook(id);
        governor.update_policy(2).unwrap();
        assert_eq!(governor.floor(2), Some(300_000));
        assert_eq!(governor.updates(), 2);
    }

    #[test]
    fn test_floor_clamped_to_ceiling() {
        let governor = SimGovernor::new(&[(0, 100, 500)]);
        governor.register_hook(Arc::new(RaiseFloor(9_999))).unwrap();
        governor.update_policy(0).unwrap();
        assert_eq!(governor.floor(0), Some(500));
    }

    #[test]
    fn test_offline_cpu() {
        let governor = SimGovernor::octa_core();
        governor.set_online(5, false);
        assert!(!governor.online_cpus().contains(&5));
        governor.set_online(5, true);
        assert_eq!(governor.online_cpus().len(), 8);
    }

    #[test]
    fn test_process_table_kill_and_mark() {
        let table = SimProcessTable::new(vec![ProcessRecord::new(10, "app", 900, 50)]);
        table.send_kill(10).unwrap();
        table.mark_kill_sent(10);
        assert_eq!(table.killed(), vec![10]);
        assert!(table.record(10).unwrap().kill_sent);

        table.fail_kill(11, "EPERM");
        assert!(table.send_kill(11).is_err());
    }
}
