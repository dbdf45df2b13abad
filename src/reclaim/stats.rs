/*!
 * Lock-Free Reclaim Statistics
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReclaimStats {
    pub periodic_passes: u64,
    pub pressure_passes: u64,
    pub throttled: u64,
    pub contended: u64,
    pub disabled: u64,
    pub victims_killed: u64,
    pub signal_failures: u64,
    pub pages_freed: u64,
}

#[repr(C, align(64))]
#[derive(Default)]
pub struct AtomicReclaimStats {
    periodic_passes: AtomicU64,
    pressure_passes: AtomicU64,
    throttled: AtomicU64,
    contended: AtomicU64,
    disabled: AtomicU64,
    victims_killed: AtomicU64,
    signal_failures: AtomicU64,
    pages_freed: AtomicU64,
}

impl AtomicReclaimStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_periodic_passes(&self) {
        self.periodic_passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_pressure_passes(&self) {
        self.pressure_passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_contended(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_disabled(&self) {
        self.disabled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_victims(&self, count: u64) {
        self.victims_killed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_signal_failures(&self, count: u64) {
        self.signal_failures.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_pages_freed(&self, pages: u64) {
        self.pages_freed.fetch_add(pages, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReclaimStats {
        ReclaimStats {
            periodic_passes: self.periodic_passes.load(Ordering::Relaxed),
            pressure_passes: self.pressure_passes.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            disabled: self.disabled.load(Ordering::Relaxed),
            victims_killed: self.victims_killed.load(Ordering::Relaxed),
            signal_failures: self.signal_failures.load(Ordering::Relaxed),
            pages_freed: self.pages_freed.load(Ordering::Relaxed),
        }
    }
}
