/*!
 * Responder Configuration
 *
 * Serde-backed configuration with defaults from `limits`, loadable from a
 * JSON file and overridable through environment variables:
 * - RESPONDER_CONFIG: path to a JSON config file
 * - RESPONDER_INPUT_BOOST_MS: input boost duration
 * - RESPONDER_WAKE_BOOST_MS: wake boost duration
 * - RESPONDER_MINFREE_MIB: reclaim target
 * - RESPONDER_PERIODIC_MS: periodic reclaim cadence
 * - RESPONDER_PRESSURE_MS: synchronous reclaim throttle
 */

use super::errors::ConfigError;
use super::limits::*;
use super::types::{CpuId, FreqKhz, Millis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime-tunable boost parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BoostTunables {
    pub input_boost_freq_lp: FreqKhz,
    pub input_boost_freq_hp: FreqKhz,
    pub remove_input_boost_freq_lp: FreqKhz,
    pub remove_input_boost_freq_hp: FreqKhz,
    pub input_boost_duration_ms: Millis,
    pub wake_boost_duration_ms: Millis,
    /// CPUs classified as the low-power cluster
    pub lp_cpus: Vec<CpuId>,
}

impl Default for BoostTunables {
    fn default() -> Self {
        Self {
            input_boost_freq_lp: DEFAULT_INPUT_BOOST_FREQ_LP,
            input_boost_freq_hp: DEFAULT_INPUT_BOOST_FREQ_HP,
            remove_input_boost_freq_lp: DEFAULT_REMOVE_BOOST_FREQ_LP,
            remove_input_boost_freq_hp: DEFAULT_REMOVE_BOOST_FREQ_HP,
            input_boost_duration_ms: DEFAULT_INPUT_BOOST_DURATION_MS,
            wake_boost_duration_ms: DEFAULT_WAKE_BOOST_DURATION_MS,
            lp_cpus: DEFAULT_LP_CPUS.to_vec(),
        }
    }
}

impl BoostTunables {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("input_boost_freq_lp", self.input_boost_freq_lp as u64)?;
        positive("input_boost_freq_hp", self.input_boost_freq_hp as u64)?;
        positive(
            "remove_input_boost_freq_lp",
            self.remove_input_boost_freq_lp as u64,
        )?;
        positive(
            "remove_input_boost_freq_hp",
            self.remove_input_boost_freq_hp as u64,
        )?;
        positive("input_boost_duration_ms", self.input_boost_duration_ms)?;
        positive("wake_boost_duration_ms", self.wake_boost_duration_ms)?;
        Ok(())
    }
}

/// Low-memory reclaimer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ReclaimConfig {
    pub minfree_mib: u64,
    pub periodic_interval_ms: Millis,
    pub pressure_interval_ms: Millis,
    pub boost_duration_ms: Millis,
    pub pressure_poll_ms: Millis,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            minfree_mib: DEFAULT_MINFREE_MIB,
            periodic_interval_ms: DEFAULT_PERIODIC_INTERVAL_MS,
            pressure_interval_ms: DEFAULT_PRESSURE_INTERVAL_MS,
            boost_duration_ms: RECLAIM_BOOST_DURATION_MS,
            pressure_poll_ms: DEFAULT_PRESSURE_POLL_MS,
        }
    }
}

impl ReclaimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("minfree_mib", self.minfree_mib)?;
        positive("periodic_interval_ms", self.periodic_interval_ms)?;
        positive("pressure_interval_ms", self.pressure_interval_ms)?;
        positive("boost_duration_ms", self.boost_duration_ms)?;
        positive("pressure_poll_ms", self.pressure_poll_ms)?;
        Ok(())
    }
}

/// Deployment settings for the worker threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkerConfig {
    /// SCHED_FIFO priority of the boost worker, 0 disables the request
    pub rt_priority: i32,
    /// CPUs to pin the boost worker to, empty leaves it unpinned
    pub affinity: Vec<CpuId>,
    pub deferred_threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            rt_priority: BOOST_WORKER_RT_PRIO,
            affinity: BOOST_WORKER_CPUS.to_vec(),
            deferred_threads: DEFAULT_DEFERRED_THREADS,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ResponderConfig {
    pub boost: BoostTunables,
    pub reclaim: ReclaimConfig,
    pub worker: WorkerConfig,
}

impl ResponderConfig {
    /// Load from `RESPONDER_CONFIG` (if set) and apply environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RESPONDER_CONFIG") {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|e| ConfigError::Invalid {
                        field: key,
                        reason: e.to_string(),
                    }),
                None => Ok(None),
            }
        };

        if let Some(v) = read("RESPONDER_INPUT_BOOST_MS")? {
            self.boost.input_boost_duration_ms = v;
        }
        if let Some(v) = read("RESPONDER_WAKE_BOOST_MS")? {
            self.boost.wake_boost_duration_ms = v;
        }
        if let Some(v) = read("RESPONDER_MINFREE_MIB")? {
            self.reclaim.minfree_mib = v;
        }
        if let Some(v) = read("RESPONDER_PERIODIC_MS")? {
            self.reclaim.periodic_interval_ms = v;
        }
        if let Some(v) = read("RESPONDER_PRESSURE_MS")? {
            self.reclaim.pressure_interval_ms = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.boost.validate()?;
        self.reclaim.validate()?;
        if self.worker.deferred_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "deferred_threads",
                reason: "at least one deferred thread is required".into(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be a positive integer".into(),
        });
    }
    Ok(())
}
