/*!
 * Reclaim Throttle
 * Last-pass timestamp and per-trigger minimum intervals
 */

use super::types::ReclaimTrigger;
use crate::core::clock::time_after_eq;
use crate::core::types::Millis;

/// Mutated only while the reclaimer's pass lock is held; the throttle lives
/// inside that lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimThrottle {
    last_reclaim_ms: Option<Millis>,
    periodic_interval_ms: Millis,
    pressure_interval_ms: Millis,
}

impl ReclaimThrottle {
    pub fn new(periodic_interval_ms: Millis, pressure_interval_ms: Millis) -> Self {
        Self {
            last_reclaim_ms: None,
            periodic_interval_ms,
            pressure_interval_ms,
        }
    }

    pub fn interval(&self, trigger: ReclaimTrigger) -> Millis {
        match trigger {
            ReclaimTrigger::Periodic => self.periodic_interval_ms,
            ReclaimTrigger::Pressure => self.pressure_interval_ms,
        }
    }

    /// Whether a pass started by `trigger` may run at `now_ms`
    pub fn allows(&self, trigger: ReclaimTrigger, now_ms: Millis) -> bool {
        match self.last_reclaim_ms {
            None => true,
            Some(last) => time_after_eq(now_ms, last.wrapping_add(self.interval(trigger))),
        }
    }

    pub fn record(&mut self, now_ms: Millis) {
        self.last_reclaim_ms = Some(now_ms);
    }

    pub fn last_reclaim_ms(&self) -> Option<Millis> {
        self.last_reclaim_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pass_always_allowed() {
        let throttle = ReclaimThrottle::new(5_000, 1_000);
        assert!(throttle.allows(ReclaimTrigger::Periodic, 1));
        assert!(throttle.allows(ReclaimTrigger::Pressure, 1));
    }

    #[test]
    fn test_intervals_are_independent() {
        let mut throttle = ReclaimThrottle::new(5_000, 1_000);
        throttle.record(10_000);

        assert!(!throttle.allows(ReclaimTrigger::Pressure, 10_999));
        assert!(throttle.allows(ReclaimTrigger::Pressure, 11_000));
        assert!(!throttle.allows(ReclaimTrigger::Periodic, 14_999));
        assert!(throttle.allows(ReclaimTrigger::Periodic, 15_000));
    }
}
