/*!
 * Lock-Free Boost Statistics
 * Atomic counters updated from kick paths, workers and deferred tasks
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the arbiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BoostStats {
    pub kicks: u64,
    pub max_kicks: u64,
    pub max_superseded: u64,
    pub max_contended: u64,
    pub input_boosts_applied: u64,
    pub input_boosts_extended: u64,
    pub max_boosts_applied: u64,
    pub max_boosts_extended: u64,
    pub input_unboosts: u64,
    pub max_unboosts: u64,
    pub unboost_all: u64,
    pub policy_passes: u64,
}

/// Atomic boost statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with the boost state
/// - Relaxed ordering; counters are independent of each other
#[repr(C, align(64))]
#[derive(Default)]
pub struct AtomicBoostStats {
    kicks: AtomicU64,
    max_kicks: AtomicU64,
    max_superseded: AtomicU64,
    max_contended: AtomicU64,
    input_boosts_applied: AtomicU64,
    input_boosts_extended: AtomicU64,
    max_boosts_applied: AtomicU64,
    max_boosts_extended: AtomicU64,
    input_unboosts: AtomicU64,
    max_unboosts: AtomicU64,
    unboost_all: AtomicU64,
    policy_passes: AtomicU64,
}

macro_rules! counter {
    ($($inc:ident => $field:ident),* $(,)?) => {
        $(
            #[inline(always)]
            pub fn $inc(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl AtomicBoostStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        inc_kicks => kicks,
        inc_max_kicks => max_kicks,
        inc_max_superseded => max_superseded,
        inc_max_contended => max_contended,
        inc_input_applied => input_boosts_applied,
        inc_input_extended => input_boosts_extended,
        inc_max_applied => max_boosts_applied,
        inc_max_extended => max_boosts_extended,
        inc_input_unboosts => input_unboosts,
        inc_max_unboosts => max_unboosts,
        inc_unboost_all => unboost_all,
        inc_policy_passes => policy_passes,
    }

    /// Individual counters are exact; the set is not a consistent cut
    pub fn snapshot(&self) -> BoostStats {
        BoostStats {
            kicks: self.kicks.load(Ordering::Relaxed),
            max_kicks: self.max_kicks.load(Ordering::Relaxed),
            max_superseded: self.max_superseded.load(Ordering::Relaxed),
            max_contended: self.max_contended.load(Ordering::Relaxed),
            input_boosts_applied: self.input_boosts_applied.load(Ordering::Relaxed),
            input_boosts_extended: self.input_boosts_extended.load(Ordering::Relaxed),
            max_boosts_applied: self.max_boosts_applied.load(Ordering::Relaxed),
            max_boosts_extended: self.max_boosts_extended.load(Ordering::Relaxed),
            input_unboosts: self.input_unboosts.load(Ordering::Relaxed),
            max_unboosts: self.max_unboosts.load(Ordering::Relaxed),
            unboost_all: self.unboost_all.load(Ordering::Relaxed),
            policy_passes: self.policy_passes.load(Ordering::Relaxed),
        }
    }
}
