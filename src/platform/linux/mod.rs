/*!
 * Linux Platform Bindings
 * sysfs cpufreq, procfs process table and /proc/meminfo
 */

mod cpufreq;
mod meminfo;
mod procfs;

pub use cpufreq::{parse_cpu_list, SysfsGovernor, SYSFS_CPU_ROOT};
pub use meminfo::{MemInfo, ProcMemInfo, MEMINFO_PATH};
pub use procfs::{parse_stat, parse_statm_resident, ProcfsProcessTable, StatLine, PROC_ROOT};
