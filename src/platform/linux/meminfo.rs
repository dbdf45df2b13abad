/*!
 * /proc/meminfo Memory Source
 */

use crate::core::errors::PlatformError;
use crate::reclaim::traits::MemorySource;
use std::fs;
use std::path::PathBuf;

pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Parsed subset of `/proc/meminfo`, in kB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: Option<u64>,
}

impl MemInfo {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut info = MemInfo::default();
        let mut seen_total = false;
        for line in raw.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse().ok()) else {
                continue;
            };
            match key.trim() {
                "MemTotal" => {
                    info.total_kb = value;
                    seen_total = true;
                }
                "MemFree" => info.free_kb = value,
                "MemAvailable" => info.available_kb = Some(value),
                _ => {}
            }
        }
        seen_total.then_some(info)
    }

    /// `MemAvailable` in MiB, or `MemFree` on kernels that lack it
    pub fn available_mib(&self) -> u64 {
        self.available_kb.unwrap_or(self.free_kb) / 1024
    }
}

pub struct ProcMemInfo {
    path: PathBuf,
}

impl ProcMemInfo {
    pub fn new() -> Self {
        Self::with_path(MEMINFO_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Result<MemInfo, PlatformError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| PlatformError::io(&self.path, e))?;
        MemInfo::parse(&raw).ok_or_else(|| PlatformError::parse(&self.path, "missing MemTotal"))
    }
}

impl Default for ProcMemInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for ProcMemInfo {
    fn available_mib(&self) -> Result<u64, PlatformError> {
        Ok(self.read()?.available_mib())
    }
}
