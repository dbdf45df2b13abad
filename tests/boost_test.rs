/*!
 * Boost Arbiter Tests
 * End-to-end arbitration against the simulated governor, input and display
 */

use pressure_responder::boost::types::{DisplayEvent, InputEvent};
use pressure_responder::boost::{BoostArbiter, BoostCollaborators, BoostFlags, BoostHandle, FrequencyGovernor};
use pressure_responder::core::clock::{Clock, ManualClock, MonotonicClock};
use pressure_responder::core::config::{BoostTunables, WorkerConfig};
use pressure_responder::core::errors::{BoostError, PlatformError};
use pressure_responder::deferred::DeferredPool;
use pressure_responder::platform::{DisplayHub, InputHub, SimGovernor};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LP_CEILING: u32 = 1_766_400;
const HP_CEILING: u32 = 2_803_200;

struct Rig {
    arbiter: Arc<BoostArbiter>,
    governor: Arc<SimGovernor>,
    input: Arc<InputHub>,
    display: Arc<DisplayHub>,
    _pool: Arc<DeferredPool>,
}

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        rt_priority: 0,
        affinity: Vec::new(),
        deferred_threads: 2,
    }
}

fn fast_tunables() -> BoostTunables {
    BoostTunables {
        input_boost_duration_ms: 150,
        wake_boost_duration_ms: 150,
        ..BoostTunables::default()
    }
}

fn collaborators(
    governor: &Arc<SimGovernor>,
    input: &Arc<InputHub>,
    display: &Arc<DisplayHub>,
) -> BoostCollaborators {
    BoostCollaborators {
        governor: governor.clone(),
        input: input.clone(),
        display: display.clone(),
    }
}

fn rig_with(tunables: BoostTunables, clock: Arc<dyn Clock>) -> Rig {
    let pool = DeferredPool::new("boost-test", 2).unwrap();
    let governor = Arc::new(SimGovernor::octa_core());
    let input = Arc::new(InputHub::new());
    let display = Arc::new(DisplayHub::new());

    let arbiter = BoostArbiter::start(
        collaborators(&governor, &input, &display),
        tunables,
        &worker_config(),
        &pool,
        clock,
    )
    .unwrap();

    Rig {
        arbiter,
        governor,
        input,
        display,
        _pool: pool,
    }
}

fn rig() -> Rig {
    rig_with(fast_tunables(), MonotonicClock::shared())
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

fn floors(governor: &SimGovernor) -> (u32, u32) {
    (governor.floor(0).unwrap(), governor.floor(4).unwrap())
}

#[test]
fn test_start_registers_everything() {
    let rig = rig();
    assert!(rig.arbiter.is_active());
    assert_eq!(rig.governor.hook_count(), 1);
    assert_eq!(rig.input.handler_count(), 1);
    assert_eq!(rig.display.listener_count(), 1);
    assert_eq!(rig.arbiter.flags(), BoostFlags::SCREEN_AWAKE);
    assert_eq!(rig.arbiter.max_boost_expiry(), 0);
}

#[test]
#[serial]
fn test_input_boost_applies_and_decays() {
    let rig = rig();
    rig.input.emit(InputEvent::touch());

    wait_until("input boost", || rig.arbiter.pending_removals().0);
    assert!(rig.arbiter.flags().contains(BoostFlags::INPUT_BOOST));
    assert_eq!(floors(&rig.governor), (1_036_800, 1_056_000));
    assert!(rig.arbiter.last_input_ms() > 0);

    wait_until("input unboost", || {
        !rig.arbiter.flags().contains(BoostFlags::INPUT_BOOST)
    });
    wait_until("idle floor", || floors(&rig.governor) == (576_000, 652_800));

    // Re-running the hook chain does not move the floor
    let updates = rig.governor.updates();
    for cpu in rig.governor.online_cpus() {
        rig.governor.update_policy(cpu).unwrap();
    }
    assert_eq!(floors(&rig.governor), (576_000, 652_800));
    assert_eq!(rig.governor.updates(), updates + 8);
}

#[test]
#[serial]
fn test_rapid_kicks_yield_one_window() {
    let rig = rig_with(
        BoostTunables {
            input_boost_duration_ms: 400,
            ..fast_tunables()
        },
        MonotonicClock::shared(),
    );

    for _ in 0..50 {
        rig.arbiter.kick();
    }
    wait_until("input boost", || rig.arbiter.pending_removals().0);
    for _ in 0..50 {
        rig.arbiter.kick();
    }
    thread::sleep(Duration::from_millis(20));

    let stats = rig.arbiter.stats();
    assert_eq!(stats.kicks, 100);
    assert_eq!(stats.input_boosts_applied, 1);

    wait_until("input unboost", || {
        !rig.arbiter.flags().contains(BoostFlags::INPUT_BOOST)
    });
    assert_eq!(rig.arbiter.stats().input_unboosts, 1);
}

#[test]
#[serial]
fn test_later_kick_extends_window() {
    let rig = rig_with(
        BoostTunables {
            input_boost_duration_ms: 300,
            ..fast_tunables()
        },
        MonotonicClock::shared(),
    );

    let start = Instant::now();
    rig.arbiter.kick();
    wait_until("input boost", || rig.arbiter.pending_removals().0);

    thread::sleep(Duration::from_millis(150).saturating_sub(start.elapsed()));
    rig.arbiter.kick();

    // The first window would have ended at 300 ms
    thread::sleep(Duration::from_millis(380).saturating_sub(start.elapsed()));
    assert!(rig.arbiter.flags().contains(BoostFlags::INPUT_BOOST));
    assert_eq!(rig.arbiter.stats().input_boosts_extended, 1);

    wait_until("input unboost", || {
        !rig.arbiter.flags().contains(BoostFlags::INPUT_BOOST)
    });
}

#[test]
fn test_kick_max_never_shortened() {
    let clock = Arc::new(ManualClock::new(1_000));
    let rig = rig_with(fast_tunables(), clock.clone());

    rig.arbiter.kick_max(5_000);
    rig.arbiter.kick_max(100);
    assert_eq!(rig.arbiter.max_boost_expiry(), 6_000);

    clock.advance(2_000);
    rig.arbiter.kick_max(3_500);
    assert_eq!(rig.arbiter.max_boost_expiry(), 6_500);
    assert_eq!(rig.arbiter.stats().max_superseded, 1);

    wait_until("max boost", || rig.arbiter.pending_removals().1);
    assert_eq!(floors(&rig.governor), (LP_CEILING, HP_CEILING));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_concurrent_kick_max_keeps_longest(durations in prop::collection::vec(1u64..60_000, 1..12)) {
        let clock = Arc::new(ManualClock::new(10_000));
        let rig = rig_with(fast_tunables(), clock.clone());

        let handles: Vec<_> = durations
            .iter()
            .map(|&d| {
                let arbiter = rig.arbiter.clone();
                thread::spawn(move || arbiter.kick_max(d))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let longest = durations.iter().copied().max().unwrap();
        prop_assert_eq!(rig.arbiter.max_boost_expiry(), 10_000 + longest);
        rig.arbiter.shutdown();
    }
}

#[test]
#[serial]
fn test_unboost_all_only_acts_when_boosted() {
    let rig = rig_with(
        BoostTunables {
            input_boost_duration_ms: 2_000,
            ..fast_tunables()
        },
        MonotonicClock::shared(),
    );

    let passes = rig.arbiter.stats().policy_passes;
    let updates = rig.governor.updates();
    assert!(!rig.arbiter.unboost_all());
    assert_eq!(rig.arbiter.stats().policy_passes, passes);
    assert_eq!(rig.governor.updates(), updates);

    rig.arbiter.kick();
    rig.arbiter.kick_max(2_000);
    wait_until("both removals", || rig.arbiter.pending_removals() == (true, true));

    let passes = rig.arbiter.stats().policy_passes;
    assert!(rig.arbiter.unboost_all());
    assert_eq!(rig.arbiter.stats().policy_passes, passes + 1);
    assert!(!rig.arbiter.flags().intersects(BoostFlags::ALL_BOOSTS));
    assert_eq!(rig.arbiter.pending_removals(), (false, false));
    assert_eq!(floors(&rig.governor), (576_000, 652_800));
}

#[test]
#[serial]
fn test_display_power_transitions() {
    let rig = rig();

    rig.display.set_power(DisplayEvent::Off);
    assert!(!rig.arbiter.flags().contains(BoostFlags::SCREEN_AWAKE));

    // No boosting while the screen is off
    rig.input.emit(InputEvent::touch());
    rig.input.emit(InputEvent::key(116));
    assert_eq!(rig.arbiter.stats().kicks, 0);

    rig.display.set_power(DisplayEvent::On);
    assert!(rig
        .arbiter
        .flags()
        .contains(BoostFlags::SCREEN_AWAKE | BoostFlags::WAKE_BOOST));
    wait_until("wake boost", || rig.arbiter.pending_removals().1);
    assert_eq!(floors(&rig.governor), (LP_CEILING, HP_CEILING));

    wait_until("wake unboost", || {
        !rig
            .arbiter
            .flags()
            .intersects(BoostFlags::WAKE_BOOST | BoostFlags::MAX_BOOST)
    });
    wait_until("idle floor", || floors(&rig.governor) == (576_000, 652_800));
    assert!(rig.arbiter.flags().contains(BoostFlags::SCREEN_AWAKE));
}

#[test]
fn test_non_qualifying_input_ignored() {
    let rig = rig();
    let mut event = InputEvent::touch();
    event.kind = pressure_responder::boost::types::InputEventKind::Other;
    rig.input.emit(event);
    assert_eq!(rig.arbiter.stats().kicks, 0);
    assert_eq!(rig.arbiter.last_input_ms(), 0);
}

#[test]
fn test_rollback_when_policy_hook_refused() {
    let pool = DeferredPool::new("rollback", 1).unwrap();
    let governor = Arc::new(SimGovernor::octa_core());
    let input = Arc::new(InputHub::new());
    let display = Arc::new(DisplayHub::new());
    governor.refuse_hooks(true);

    let result = BoostArbiter::start(
        collaborators(&governor, &input, &display),
        fast_tunables(),
        &worker_config(),
        &pool,
        MonotonicClock::shared(),
    );
    assert!(matches!(
        result,
        Err(BoostError::PolicyNotifier(PlatformError::RegistrationRefused {
            registry: "policy notifier"
        }))
    ));
    assert_eq!(input.handler_count(), 0);
    assert_eq!(display.listener_count(), 0);
}

#[test]
fn test_rollback_when_input_refused() {
    let pool = DeferredPool::new("rollback", 1).unwrap();
    let governor = Arc::new(SimGovernor::octa_core());
    let input = Arc::new(InputHub::new());
    let display = Arc::new(DisplayHub::new());
    input.refuse_registrations(true);

    let result = BoostArbiter::start(
        collaborators(&governor, &input, &display),
        fast_tunables(),
        &worker_config(),
        &pool,
        MonotonicClock::shared(),
    );
    let Err(err) = result else {
        panic!("start succeeded with a refusing input hub");
    };
    let source = std::error::Error::source(&err).map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("input hub refused registration"));
    assert!(matches!(err, BoostError::InputHandler(_)));
    assert_eq!(governor.hook_count(), 0);
    assert_eq!(display.listener_count(), 0);
}

#[test]
fn test_rollback_when_display_refused_disables_feature() {
    let pool = DeferredPool::new("rollback", 1).unwrap();
    let governor = Arc::new(SimGovernor::octa_core());
    let input = Arc::new(InputHub::new());
    let display = Arc::new(DisplayHub::new());
    display.refuse_registrations(true);

    let handle = BoostHandle::from_start(BoostArbiter::start(
        collaborators(&governor, &input, &display),
        fast_tunables(),
        &worker_config(),
        &pool,
        MonotonicClock::shared(),
    ));
    assert!(!handle.is_enabled());
    assert_eq!(governor.hook_count(), 0);
    assert_eq!(input.handler_count(), 0);

    // Kicks on a disabled feature are no-ops
    handle.kick();
    handle.kick_max(1_000);
    assert_eq!(governor.updates(), 0);
}

#[test]
#[serial]
fn test_shutdown_unregisters_and_resets_floor() {
    let rig = rig();
    rig.arbiter.kick_max(5_000);
    wait_until("max boost", || rig.arbiter.pending_removals().1);

    rig.arbiter.shutdown();
    assert!(!rig.arbiter.is_active());
    assert_eq!(rig.governor.hook_count(), 0);
    assert_eq!(rig.input.handler_count(), 0);
    assert_eq!(rig.display.listener_count(), 0);
    assert_eq!(rig.arbiter.pending_removals(), (false, false));
    assert_eq!(floors(&rig.governor), (576_000, 652_800));

    let kicks = rig.arbiter.stats().kicks;
    rig.arbiter.kick();
    assert_eq!(rig.arbiter.stats().kicks, kicks);
}

#[test]
fn test_set_tunables_validates_and_refreshes() {
    let rig = rig();

    let invalid = BoostTunables {
        input_boost_duration_ms: 0,
        ..fast_tunables()
    };
    assert!(rig.arbiter.set_tunables(invalid).is_err());

    let raised = BoostTunables {
        remove_input_boost_freq_lp: 800_000,
        ..fast_tunables()
    };
    rig.arbiter.set_tunables(raised).unwrap();
    assert_eq!(rig.arbiter.tunables().remove_input_boost_freq_lp, 800_000);
    assert_eq!(floors(&rig.governor), (800_000, 652_800));
}
