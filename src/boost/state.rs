/*!
 * Boost State
 *
 * Shared atomic bitmask plus the max-boost expiry and duration. The single
 * source of truth read by the policy hook and written by the arbiter.
 *
 * # Concurrency
 * - Each bit set/clear is one atomic RMW; composite reads are eventually consistent
 * - `max_boost_expiry` only moves forward, through compare-and-swap
 */

use super::types::BoostFlags;
use crate::core::clock::time_after;
use crate::core::limits::MAX_BOOST_CAS_RETRIES;
use crate::core::types::Millis;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Outcome of a max-boost expiry extension attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// Expiry moved forward to the candidate
    Extended,
    /// An equal or later expiry is already in effect
    Superseded,
    /// Retries exhausted under contention; another requester won every round
    Contended,
}

#[repr(C, align(64))]
pub struct BoostState {
    flags: AtomicU32,
    max_boost_expiry: AtomicU64,
    max_boost_duration: AtomicU64,
}

impl BoostState {
    pub fn new(initial: BoostFlags) -> Self {
        Self {
            flags: AtomicU32::new(initial.bits()),
            max_boost_expiry: AtomicU64::new(0),
            max_boost_duration: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn flags(&self) -> BoostFlags {
        BoostFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub fn contains(&self, bits: BoostFlags) -> bool {
        self.flags().contains(bits)
    }

    /// Set bits, returning the previous flags
    #[inline]
    pub fn set(&self, bits: BoostFlags) -> BoostFlags {
        BoostFlags::from_bits_truncate(self.flags.fetch_or(bits.bits(), Ordering::AcqRel))
    }

    /// Clear bits, returning the previous flags
    #[inline]
    pub fn clear(&self, bits: BoostFlags) -> BoostFlags {
        BoostFlags::from_bits_truncate(self.flags.fetch_and(!bits.bits(), Ordering::AcqRel))
    }

    #[inline]
    pub fn max_boost_expiry(&self) -> Millis {
        self.max_boost_expiry.load(Ordering::Acquire)
    }

    #[inline]
    pub fn max_boost_duration(&self) -> Millis {
        self.max_boost_duration.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_max_boost_duration(&self, duration_ms: Millis) {
        self.max_boost_duration.store(duration_ms, Ordering::Release);
    }

    /// Move the expiry to `candidate` only if it is strictly later.
    ///
    /// A loser of the race re-reads the winner's value and tries again, so the
    /// latest expiry always survives regardless of arrival order.
    pub fn try_extend_expiry(&self, candidate: Millis) -> ExtendOutcome {
        let mut current = self.max_boost_expiry.load(Ordering::Acquire);

        for _ in 0..MAX_BOOST_CAS_RETRIES {
            if !time_after(candidate, current) {
                return ExtendOutcome::Superseded;
            }

            match self.max_boost_expiry.compare_exchange(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return ExtendOutcome::Extended,
                Err(actual) => current = actual,
            }
        }

        ExtendOutcome::Contended
    }
}

impl Default for BoostState {
    fn default() -> Self {
        Self::new(BoostFlags::SCREEN_AWAKE)
    }
}

impl std::fmt::Debug for BoostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostState")
            .field("flags", &self.flags())
            .field("max_boost_expiry", &self.max_boost_expiry())
            .field("max_boost_duration", &self.max_boost_duration())
            .finish()
    }
}
