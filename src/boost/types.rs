/*!
 * Boost Types
 * Flags, per-CPU policy records and collaborator events
 */

use crate::core::types::{CpuId, FreqKhz};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Boost state bits; each one is set and cleared atomically on its own
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoostFlags: u32 {
        const SCREEN_AWAKE = 1 << 0;
        const INPUT_BOOST  = 1 << 1;
        const WAKE_BOOST   = 1 << 2;
        const MAX_BOOST    = 1 << 3;
    }
}

impl BoostFlags {
    /// Every bit that raises the frequency floor
    pub const ALL_BOOSTS: Self = Self::INPUT_BOOST
        .union(Self::WAKE_BOOST)
        .union(Self::MAX_BOOST);

    /// Frequency regime these bits select
    pub fn regime(self) -> BoostRegime {
        if self.contains(Self::MAX_BOOST) {
            BoostRegime::Max
        } else if self.contains(Self::INPUT_BOOST) {
            BoostRegime::Input
        } else {
            BoostRegime::Idle
        }
    }
}

/// Frequency floor regime derived from the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostRegime {
    /// Floor = ceiling
    Max,
    /// Floor = min(ceiling, boost frequency of the CPU class)
    Input,
    /// Floor = max(absolute minimum, post-boost minimum of the CPU class)
    Idle,
}

/// CPU cluster classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuClass {
    LowPower,
    HighPerformance,
}

/// Mutable per-CPU policy record handed to the policy hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuPolicy {
    pub cpu: CpuId,
    /// Lowest frequency the governor may pick; written by the hook
    pub floor: FreqKhz,
    /// Highest frequency the governor may pick
    pub ceiling: FreqKhz,
    /// Hardware minimum frequency
    pub absolute_min: FreqKhz,
}

impl CpuPolicy {
    pub fn new(cpu: CpuId, absolute_min: FreqKhz, ceiling: FreqKhz) -> Self {
        Self {
            cpu,
            floor: absolute_min,
            ceiling,
            absolute_min,
        }
    }
}

/// Return signal of a policy hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Continue,
    Stop,
}

/// Input event kinds the arbiter cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEventKind {
    /// Multi-touch or touchpad contact
    Touch,
    /// Key or button press
    Key,
    /// Anything else (sensors, switches, ...)
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn touch() -> Self {
        Self {
            kind: InputEventKind::Touch,
            code: 0,
            value: 1,
        }
    }

    pub fn key(code: u16) -> Self {
        Self {
            kind: InputEventKind::Key,
            code,
            value: 1,
        }
    }

    /// Touch and key events may trigger a boost
    pub fn qualifies(&self) -> bool {
        matches!(self.kind, InputEventKind::Touch | InputEventKind::Key)
    }
}

/// Display power transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayEvent {
    On,
    Off,
}

/// Opaque registration token returned by collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_precedence() {
        assert_eq!(BoostFlags::empty().regime(), BoostRegime::Idle);
        assert_eq!(BoostFlags::SCREEN_AWAKE.regime(), BoostRegime::Idle);
        assert_eq!(BoostFlags::INPUT_BOOST.regime(), BoostRegime::Input);
        assert_eq!(
            (BoostFlags::INPUT_BOOST | BoostFlags::MAX_BOOST).regime(),
            BoostRegime::Max
        );
        // Wake bit alone does not raise the floor
        assert_eq!(BoostFlags::WAKE_BOOST.regime(), BoostRegime::Idle);
    }

    #[test]
    fn test_qualifying_input() {
        assert!(InputEvent::touch().qualifies());
        assert!(InputEvent::key(116).qualifies());
        let other = InputEvent {
            kind: InputEventKind::Other,
            code: 0,
            value: 0,
        };
        assert!(!other.qualifies());
    }
}
