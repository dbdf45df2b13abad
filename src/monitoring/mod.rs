/*!
 * Monitoring Module
 * Tracing setup and a combined statistics snapshot
 */

pub mod tracer;

pub use tracer::init_tracing;

use crate::boost::stats::BoostStats;
use crate::reclaim::stats::ReclaimStats;
use serde::{Deserialize, Serialize};

/// Counters of both controllers, as reported by the daemon's `stats` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderStats {
    /// `None` while boosting is disabled
    pub boost: Option<BoostStats>,
    pub reclaim: ReclaimStats,
}

impl ResponderStats {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_json_shape() {
        let stats = ResponderStats::default();
        let value: serde_json::Value = serde_json::from_str(&stats.to_json()).unwrap();
        assert!(value["boost"].is_null());
        assert_eq!(value["reclaim"]["victims_killed"], 0);
    }
}
