/*!
 * Sysfs cpufreq Governor
 *
 * Applies policy floors through `/sys/devices/system/cpu/cpuN/cpufreq`:
 * the hook chain starts from `cpuinfo_min_freq`, is capped by
 * `scaling_max_freq`, and the result is written to `scaling_min_freq`.
 */

use crate::boost::traits::{FrequencyGovernor, PolicyHook};
use crate::boost::types::{CpuPolicy, NotifyAction, RegistrationId};
use crate::core::errors::PlatformError;
use crate::core::types::{CpuId, FreqKhz};
use crate::platform::registry::Registry;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

pub struct SysfsGovernor {
    root: PathBuf,
    hooks: Registry<dyn PolicyHook>,
    update_lock: Mutex<()>,
}

impl SysfsGovernor {
    pub fn new() -> Self {
        Self::with_root(SYSFS_CPU_ROOT)
    }

    /// Governor over an alternate sysfs tree
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hooks: Registry::new("cpufreq notifier"),
            update_lock: Mutex::new(()),
        }
    }

    /// Whether cpufreq is exposed for at least the first online CPU
    pub fn is_supported(&self) -> bool {
        self.online_cpus()
            .first()
            .map(|&cpu| self.cpufreq_dir(cpu).join("scaling_min_freq").exists())
            .unwrap_or(false)
    }

    fn cpufreq_dir(&self, cpu: CpuId) -> PathBuf {
        self.root.join(format!("cpu{}", cpu)).join("cpufreq")
    }

    fn read_khz(path: &Path) -> Result<FreqKhz, PlatformError> {
        let raw = fs::read_to_string(path).map_err(|e| PlatformError::io(path, e))?;
        raw.trim()
            .parse()
            .map_err(|e| PlatformError::parse(path, format!("{}", e)))
    }

    /// Current policy of `cpu` with the floor at its absolute minimum
    pub fn read_policy(&self, cpu: CpuId) -> Result<CpuPolicy, PlatformError> {
        let dir = self.cpufreq_dir(cpu);
        let absolute_min = Self::read_khz(&dir.join("cpuinfo_min_freq"))?;
        let ceiling = Self::read_khz(&dir.join("scaling_max_freq"))?;
        Ok(CpuPolicy::new(cpu, absolute_min, ceiling))
    }

    pub fn read_floor(&self, cpu: CpuId) -> Result<FreqKhz, PlatformError> {
        Self::read_khz(&self.cpufreq_dir(cpu).join("scaling_min_freq"))
    }
}

impl Default for SysfsGovernor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a kernel cpu list such as `0-3,6,8-9`
pub fn parse_cpu_list(raw: &str) -> Option<Vec<CpuId>> {
    let mut cpus = Vec::new();
    for part in raw.trim().split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: CpuId = start.trim().parse().ok()?;
                let end: CpuId = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                cpus.extend(start..=end);
            }
            None => cpus.push(part.trim().parse().ok()?),
        }
    }
    Some(cpus)
}

impl FrequencyGovernor for SysfsGovernor {
    fn register_hook(&self, hook: Arc<dyn PolicyHook>) -> Result<RegistrationId, PlatformError> {
        let id = self.hooks.register(hook)?;
        debug!("cpufreq hook {:?} registered", id);
        Ok(id)
    }

    fn unregister_hook(&self, id: RegistrationId) {
        if self.hooks.unregister(id) {
            debug!("cpufreq hook {:?} unregistered", id);
        }
    }

    fn online_cpus(&self) -> Vec<CpuId> {
        let path = self.root.join("online");
        match fs::read_to_string(&path) {
            Ok(raw) => parse_cpu_list(&raw).unwrap_or_else(|| {
                warn!("Malformed cpu list in {}: {:?}", path.display(), raw);
                Vec::new()
            }),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn update_policy(&self, cpu: CpuId) -> Result<(), PlatformError> {
        let _guard = self.update_lock.lock();

        let mut policy = self.read_policy(cpu)?;
        for hook in self.hooks.snapshot() {
            if hook.on_policy_adjust(&mut policy) == NotifyAction::Stop {
                break;
            }
        }
        let floor = policy.floor.clamp(policy.absolute_min, policy.ceiling);

        let path = self.cpufreq_dir(cpu).join("scaling_min_freq");
        fs::write(&path, floor.to_string()).map_err(|e| PlatformError::io(&path, e))?;
        trace!("cpu{} scaling_min_freq -> {} kHz", cpu, floor);
        Ok(())
    }
}
