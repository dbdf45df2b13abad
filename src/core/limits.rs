/*!
 * System Limits and Constants
 *
 * Centralized location for the built-in defaults, thresholds and tables of
 * the boost arbiter and the low-memory reclaimer. Anything runtime-tunable
 * starts from the values here and is overridden through configuration.
 */

use super::types::{CpuId, FreqKhz, Millis, OomScoreAdj, Pages};

// =============================================================================
// INPUT BOOST DEFAULTS
// =============================================================================

/// Input boost frequency for the low-power cluster (kHz)
pub const DEFAULT_INPUT_BOOST_FREQ_LP: FreqKhz = 1_036_800;

/// Input boost frequency for the high-performance cluster (kHz)
pub const DEFAULT_INPUT_BOOST_FREQ_HP: FreqKhz = 1_056_000;

/// Post-boost minimum frequency for the low-power cluster (kHz)
pub const DEFAULT_REMOVE_BOOST_FREQ_LP: FreqKhz = 576_000;

/// Post-boost minimum frequency for the high-performance cluster (kHz)
pub const DEFAULT_REMOVE_BOOST_FREQ_HP: FreqKhz = 652_800;

/// How long a single input event keeps the floor raised
pub const DEFAULT_INPUT_BOOST_DURATION_MS: Millis = 100;

/// Max boost issued when the display turns on
pub const DEFAULT_WAKE_BOOST_DURATION_MS: Millis = 1_000;

/// CPUs belonging to the low-power cluster; everything else is high-performance
pub const DEFAULT_LP_CPUS: [CpuId; 4] = [0, 1, 2, 3];

// =============================================================================
// BOOST WORKER
// =============================================================================

/// Highest real-time priority on Linux
pub const MAX_RT_PRIO: i32 = 100;

/// SCHED_FIFO priority of the dedicated boost worker
pub const BOOST_WORKER_RT_PRIO: i32 = MAX_RT_PRIO - 2;

/// CPUs the boost worker is pinned to (best effort)
pub const BOOST_WORKER_CPUS: [CpuId; 3] = [1, 2, 3];

/// Upper bound on compare-and-swap retries when extending the max boost
/// [PERF] Contention windows are microsecond-scale; this is never reached in practice
pub const MAX_BOOST_CAS_RETRIES: usize = 64;

/// Timer threads in the general-purpose deferred pool
pub const DEFAULT_DEFERRED_THREADS: usize = 2;

// =============================================================================
// RECLAIM DEFAULTS
// =============================================================================

/// Duration to boost CPU and memory bus to the max per reclaim event
pub const RECLAIM_BOOST_DURATION_MS: Millis = 250;

/// Free-memory target of a reclaim pass (MiB)
pub const DEFAULT_MINFREE_MIB: u64 = 100;

/// Cadence and minimum interval of the periodic safety-net pass
pub const DEFAULT_PERIODIC_INTERVAL_MS: Millis = 5_000;

/// Minimum interval between synchronous pressure passes
pub const DEFAULT_PRESSURE_INTERVAL_MS: Millis = 1_000;

/// Polling interval of the memory pressure monitor
pub const DEFAULT_PRESSURE_POLL_MS: Millis = 250;

/// Page size assumed when the platform cannot report one
pub const FALLBACK_PAGE_SIZE: u64 = 4096;

/// RSS below which a process is not worth signaling
pub const MIN_VICTIM_PAGES: Pages = 1;

/// Kill-priority break-points, most disposable first.
/// Pulled from the Android framework process list.
pub const ADJ_PRIO: [OomScoreAdj; 11] = [
    906, // CACHED_APP_MAX_ADJ
    900, // CACHED_APP_MIN_ADJ
    800, // SERVICE_B_ADJ
    700, // PREVIOUS_APP_ADJ
    600, // HOME_APP_ADJ
    500, // SERVICE_ADJ
    400, // HEAVY_WEIGHT_APP_ADJ
    300, // BACKUP_APP_ADJ
    200, // PERCEPTIBLE_APP_ADJ
    100, // VISIBLE_APP_ADJ
    0,   // FOREGROUND_APP_ADJ
];

/// SCHED_FIFO priority given to victims so they exit quickly
pub const VICTIM_RT_PRIO: i32 = MAX_RT_PRIO - 1;
