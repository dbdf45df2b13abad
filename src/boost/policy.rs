/*!
 * Frequency Policy Hook
 *
 * The arbiter's only point of applying a boost: writes each CPU's frequency
 * floor from the current boost regime. Reads the flags once per call, so a
 * short-lived intermediate state may be observed; the next re-evaluation
 * corrects it.
 */

use super::state::BoostState;
use super::traits::PolicyHook;
use super::types::{BoostRegime, CpuClass, CpuPolicy, NotifyAction};
use crate::core::config::BoostTunables;
use crate::core::types::{CpuId, FreqKhz};
use arc_swap::ArcSwap;
use std::sync::Arc;

pub struct BoostPolicyHook {
    state: Arc<BoostState>,
    tunables: Arc<ArcSwap<BoostTunables>>,
}

impl BoostPolicyHook {
    pub fn new(state: Arc<BoostState>, tunables: Arc<ArcSwap<BoostTunables>>) -> Self {
        Self { state, tunables }
    }

    pub fn classify(tunables: &BoostTunables, cpu: CpuId) -> CpuClass {
        if tunables.lp_cpus.contains(&cpu) {
            CpuClass::LowPower
        } else {
            CpuClass::HighPerformance
        }
    }

    fn boost_freq(tunables: &BoostTunables, class: CpuClass) -> FreqKhz {
        match class {
            CpuClass::LowPower => tunables.input_boost_freq_lp,
            CpuClass::HighPerformance => tunables.input_boost_freq_hp,
        }
    }

    fn min_freq(tunables: &BoostTunables, class: CpuClass) -> FreqKhz {
        match class {
            CpuClass::LowPower => tunables.remove_input_boost_freq_lp,
            CpuClass::HighPerformance => tunables.remove_input_boost_freq_hp,
        }
    }

    /// Floor for `policy` under `regime`
    pub fn floor_for(
        tunables: &BoostTunables,
        regime: BoostRegime,
        policy: &CpuPolicy,
    ) -> FreqKhz {
        let class = Self::classify(tunables, policy.cpu);
        match regime {
            BoostRegime::Max => policy.ceiling,
            BoostRegime::Input => policy.ceiling.min(Self::boost_freq(tunables, class)),
            BoostRegime::Idle => policy.absolute_min.max(Self::min_freq(tunables, class)),
        }
    }
}

impl PolicyHook for BoostPolicyHook {
    fn on_policy_adjust(&self, policy: &mut CpuPolicy) -> NotifyAction {
        let regime = self.state.flags().regime();
        let tunables = self.tunables.load();
        policy.floor = Self::floor_for(&tunables, regime, policy);
        NotifyAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boost::types::BoostFlags;

    fn hook() -> (BoostPolicyHook, Arc<BoostState>) {
        let state = Arc::new(BoostState::new(BoostFlags::SCREEN_AWAKE));
        let tunables = Arc::new(ArcSwap::from_pointee(BoostTunables {
            input_boost_freq_lp: 1_000_000,
            input_boost_freq_hp: 1_500_000,
            remove_input_boost_freq_lp: 300_000,
            remove_input_boost_freq_hp: 400_000,
            lp_cpus: vec![0, 1],
            ..BoostTunables::default()
        }));
        (BoostPolicyHook::new(state.clone(), tunables), state)
    }

    #[test]
    fn test_idle_floor_respects_absolute_min() {
        let (hook, _) = hook();
        let mut lp = CpuPolicy::new(0, 200_000, 1_800_000);
        let mut hp = CpuPolicy::new(4, 500_000, 2_400_000);

        assert_eq!(hook.on_policy_adjust(&mut lp), NotifyAction::Continue);
        hook.on_policy_adjust(&mut hp);

        assert_eq!(lp.floor, 300_000);
        // Hardware minimum wins over a lower post-boost minimum
        assert_eq!(hp.floor, 500_000);
    }

    #[test]
    fn test_input_floor_clamped_to_ceiling() {
        let (hook, state) = hook();
        state.set(BoostFlags::INPUT_BOOST);

        let mut lp = CpuPolicy::new(1, 200_000, 1_800_000);
        let mut hp = CpuPolicy::new(5, 300_000, 1_200_000);
        hook.on_policy_adjust(&mut lp);
        hook.on_policy_adjust(&mut hp);

        assert_eq!(lp.floor, 1_000_000);
        assert_eq!(hp.floor, 1_200_000);
    }

    #[test]
    fn test_max_boost_pins_floor_to_ceiling() {
        let (hook, state) = hook();
        state.set(BoostFlags::INPUT_BOOST | BoostFlags::MAX_BOOST);

        let mut policy = CpuPolicy::new(6, 300_000, 2_800_000);
        hook.on_policy_adjust(&mut policy);
        assert_eq!(policy.floor, 2_800_000);

        // Idempotent under repeated invocation
        hook.on_policy_adjust(&mut policy);
        assert_eq!(policy.floor, 2_800_000);

        state.clear(BoostFlags::MAX_BOOST | BoostFlags::INPUT_BOOST);
        hook.on_policy_adjust(&mut policy);
        assert_eq!(policy.floor, 400_000);
    }
}
