/*!
 * Monotonic Clock
 * Millisecond time source shared by the arbiter and the reclaimer
 */

use super::types::Millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond clock
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> Millis;
}

/// Wrapping "a is after b" comparison on millisecond timestamps
#[inline]
pub fn time_after(a: Millis, b: Millis) -> bool {
    (b.wrapping_sub(a) as i64) < 0
}

/// Wrapping "a is after or equal to b" comparison
#[inline]
pub fn time_after_eq(a: Millis, b: Millis) -> bool {
    (a.wrapping_sub(b) as i64) >= 0
}

/// Instant-based clock
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Shared handle for injection into collaborators
    pub fn shared() -> Arc<dyn Clock> {
        Arc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> Millis {
        // Offset by one so that 0 never denotes "now"
        self.origin.elapsed().as_millis() as Millis + 1
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: Millis) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: Millis) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_after_wraps() {
        assert!(time_after(10, 5));
        assert!(!time_after(5, 10));
        assert!(!time_after(5, 5));
        assert!(time_after_eq(5, 5));
        // Just past the wrap point is still "after"
        assert!(time_after(3, u64::MAX - 2));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now_ms(), 150);
        clock.set(7);
        assert_eq!(clock.now_ms(), 7);
    }

    #[test]
    fn test_monotonic_clock_never_zero() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 1);
        assert!(b >= a);
    }
}
