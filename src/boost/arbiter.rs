/*!
 * Boost Arbiter
 *
 * Owns the boost state and sequences boosts and unboosts:
 * - `kick` queues the input boost on the dedicated worker
 * - `kick_max` extends the max-boost expiry (never shortens it) and queues the max boost
 * - the workers set a bit only if no removal was pending, then (re)arm the removal
 * - removals fire on the deferred pool and clear their bits unconditionally
 */

use super::handlers::{ArbiterDisplayListener, ArbiterInputHandler};
use super::policy::BoostPolicyHook;
use super::state::{BoostState, ExtendOutcome};
use super::stats::{AtomicBoostStats, BoostStats};
use super::traits::{DisplaySource, FrequencyGovernor, InputSource};
use super::types::{BoostFlags, DisplayEvent, InputEvent, RegistrationId};
use super::worker::{BoostWorker, WorkItem};
use crate::core::clock::{time_after, Clock};
use crate::core::config::{BoostTunables, WorkerConfig};
use crate::core::errors::{BoostError, ConfigError};
use crate::core::types::Millis;
use crate::deferred::{DeferredPool, DelayedTask};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// External subsystems the arbiter registers with
#[derive(Clone)]
pub struct BoostCollaborators {
    pub governor: Arc<dyn FrequencyGovernor>,
    pub input: Arc<dyn InputSource>,
    pub display: Arc<dyn DisplaySource>,
}

/// State shared between the arbiter, its worker and its deferred removals
struct ArbiterCore {
    state: Arc<BoostState>,
    tunables: Arc<ArcSwap<BoostTunables>>,
    governor: Arc<dyn FrequencyGovernor>,
    clock: Arc<dyn Clock>,
    stats: AtomicBoostStats,
    input_unboost: DelayedTask,
    max_unboost: DelayedTask,
}

impl ArbiterCore {
    fn new(
        pool: &DeferredPool,
        governor: Arc<dyn FrequencyGovernor>,
        tunables: BoostTunables,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let input_core = weak.clone();
            let input_unboost = DelayedTask::new(pool, "input-unboost", move |_| {
                if let Some(core) = input_core.upgrade() {
                    core.input_unboost_work();
                }
            });

            let max_core = weak.clone();
            let max_unboost = DelayedTask::new(pool, "max-unboost", move |_| {
                if let Some(core) = max_core.upgrade() {
                    core.max_unboost_work();
                }
            });

            Self {
                state: Arc::new(BoostState::new(BoostFlags::SCREEN_AWAKE)),
                tunables: Arc::new(ArcSwap::from_pointee(tunables)),
                governor,
                clock,
                stats: AtomicBoostStats::new(),
                input_unboost,
                max_unboost,
            }
        })
    }

    fn execute(&self, item: WorkItem) {
        match item {
            WorkItem::InputBoost => self.input_boost_work(),
            WorkItem::MaxBoost => self.max_boost_work(),
        }
    }

    /// Force every online CPU through the policy hook chain
    fn refresh_policy(&self) {
        self.stats.inc_policy_passes();
        for cpu in self.governor.online_cpus() {
            if let Err(e) = self.governor.update_policy(cpu) {
                warn!(cpu, error = %e, "Failed to update CPU policy");
            }
        }
    }

    fn input_boost_work(&self) {
        // A pending removal means the bit is already set; only the expiry moves
        if self.input_unboost.cancel_sync().was_idle() {
            self.state.set(BoostFlags::INPUT_BOOST);
            self.stats.inc_input_applied();
            self.refresh_policy();
            debug!("Input boost applied");
        } else {
            self.stats.inc_input_extended();
        }

        let duration_ms = self.tunables.load().input_boost_duration_ms;
        if !self.input_unboost.queue(Duration::from_millis(duration_ms)) {
            warn!("Input boost removal could not be scheduled");
        }
    }

    fn input_unboost_work(&self) {
        self.state.clear(BoostFlags::INPUT_BOOST);
        self.stats.inc_input_unboosts();
        self.refresh_policy();
        debug!("Input boost removed");
    }

    fn max_boost_work(&self) {
        if self.max_unboost.cancel_sync().was_idle() {
            self.state.set(BoostFlags::MAX_BOOST);
            self.stats.inc_max_applied();
            self.refresh_policy();
            debug!("Max boost applied");
        } else {
            self.stats.inc_max_extended();
        }

        let duration_ms = self.max_boost_delay();
        if !self.max_unboost.queue(Duration::from_millis(duration_ms)) {
            warn!("Max boost removal could not be scheduled");
        }
    }

    /// Latest recorded duration, never less than what remains of the expiry
    fn max_boost_delay(&self) -> Millis {
        let recorded = self.state.max_boost_duration();
        let now = self.clock.now_ms();
        let expiry = self.state.max_boost_expiry();
        let remaining = if time_after(expiry, now) {
            expiry.wrapping_sub(now)
        } else {
            0
        };
        recorded.max(remaining)
    }

    fn max_unboost_work(&self) {
        self.state
            .clear(BoostFlags::WAKE_BOOST | BoostFlags::MAX_BOOST);
        self.stats.inc_max_unboosts();
        self.refresh_policy();
        debug!("Max boost removed");
    }

    fn unboost_all(&self) -> bool {
        let input = self.input_unboost.cancel_sync();
        let max = self.max_unboost.cancel_sync();
        if input.was_idle() && max.was_idle() {
            return false;
        }

        self.state.clear(BoostFlags::ALL_BOOSTS);
        self.stats.inc_unboost_all();
        self.refresh_policy();
        debug!("All boosts removed");
        true
    }
}

#[derive(Default)]
struct Registrations {
    policy: Option<RegistrationId>,
    input: Option<RegistrationId>,
    display: Option<RegistrationId>,
}

/// CPU frequency-floor boost arbiter
pub struct BoostArbiter {
    core: Arc<ArbiterCore>,
    worker: BoostWorker,
    collaborators: BoostCollaborators,
    registrations: Mutex<Registrations>,
    active: AtomicBool,
    torn_down: AtomicBool,
    last_input_ms: AtomicU64,
}

impl BoostArbiter {
    /// Start the worker and register with the collaborators, in that order.
    ///
    /// On failure everything registered so far is unwound in reverse order and
    /// the error is returned; the caller keeps the feature disabled.
    pub fn start(
        collaborators: BoostCollaborators,
        tunables: BoostTunables,
        worker_config: &WorkerConfig,
        pool: &Arc<DeferredPool>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, BoostError> {
        let core = ArbiterCore::new(pool, collaborators.governor.clone(), tunables, clock);

        let worker_core = Arc::downgrade(&core);
        let worker = BoostWorker::spawn(worker_config, move |item| {
            if let Some(core) = worker_core.upgrade() {
                core.execute(item);
            }
        })
        .map_err(|e| {
            error!(error = %e, "Failed to start boost worker");
            BoostError::WorkerSpawn(e.to_string())
        })?;

        let arbiter = Arc::new(Self {
            core,
            worker,
            collaborators,
            registrations: Mutex::new(Registrations::default()),
            active: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            last_input_ms: AtomicU64::new(0),
        });

        if let Err(e) = arbiter.register_all() {
            error!(error = %e, "Boost arbiter initialization failed, rolling back");
            arbiter.rollback();
            return Err(e);
        }

        arbiter.active.store(true, Ordering::Release);
        info!("Boost arbiter initialized");
        Ok(arbiter)
    }

    fn register_all(self: &Arc<Self>) -> Result<(), BoostError> {
        let hook = Arc::new(BoostPolicyHook::new(
            self.core.state.clone(),
            self.core.tunables.clone(),
        ));
        let policy_id = self
            .collaborators
            .governor
            .register_hook(hook)
            .map_err(BoostError::PolicyNotifier)?;
        self.registrations.lock().policy = Some(policy_id);

        let handler = Arc::new(ArbiterInputHandler::new(Arc::downgrade(self)));
        let input_id = self
            .collaborators
            .input
            .register_handler(handler)
            .map_err(BoostError::InputHandler)?;
        self.registrations.lock().input = Some(input_id);

        let listener = Arc::new(ArbiterDisplayListener::new(Arc::downgrade(self)));
        let display_id = self
            .collaborators
            .display
            .register_listener(listener)
            .map_err(BoostError::DisplayListener)?;
        self.registrations.lock().display = Some(display_id);

        Ok(())
    }

    /// Unwind partial registrations in strict reverse order
    fn rollback(&self) {
        self.torn_down.store(true, Ordering::Release);
        let mut regs = self.registrations.lock();

        if let Some(id) = regs.display.take() {
            self.collaborators.display.unregister_listener(id);
        }
        if let Some(id) = regs.input.take() {
            self.collaborators.input.unregister_handler(id);
        }
        if let Some(id) = regs.policy.take() {
            self.collaborators.governor.unregister_hook(id);
        }
        drop(regs);

        self.worker.shutdown();
        self.core.input_unboost.cancel_sync();
        self.core.max_unboost.cancel_sync();
    }

    /// Stop accepting kicks, drain the worker, cancel the removals and reset the floor
    pub fn shutdown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.active.store(false, Ordering::Release);

        let (display, input, policy) = {
            let mut regs = self.registrations.lock();
            (regs.display.take(), regs.input.take(), regs.policy.take())
        };
        if let Some(id) = display {
            self.collaborators.display.unregister_listener(id);
        }
        if let Some(id) = input {
            self.collaborators.input.unregister_handler(id);
        }

        self.worker.shutdown();
        self.core.input_unboost.cancel_sync();
        self.core.max_unboost.cancel_sync();

        // Leave the floor at the idle regime while the hook is still registered
        if self
            .core
            .state
            .clear(BoostFlags::ALL_BOOSTS)
            .intersects(BoostFlags::ALL_BOOSTS)
        {
            self.core.refresh_policy();
        }

        if let Some(id) = policy {
            self.collaborators.governor.unregister_hook(id);
        }
        info!("Boost arbiter shut down");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Request an input boost; redundant kicks while one is queued are no-ops
    pub fn kick(&self) {
        if !self.is_active() {
            return;
        }
        self.core.stats.inc_kicks();
        self.worker.queue(WorkItem::InputBoost);
    }

    /// Request a max-frequency boost lasting at least `duration_ms`
    pub fn kick_max(&self, duration_ms: Millis) {
        if !self.is_active() {
            return;
        }
        self.core.stats.inc_max_kicks();

        let candidate = self.core.clock.now_ms().wrapping_add(duration_ms);
        match self.core.state.try_extend_expiry(candidate) {
            ExtendOutcome::Extended => {
                self.core.state.set_max_boost_duration(duration_ms);
                self.worker.queue(WorkItem::MaxBoost);
                trace!(duration_ms, expiry = candidate, "Max boost extended");
            }
            ExtendOutcome::Superseded => {
                self.core.stats.inc_max_superseded();
                trace!(duration_ms, "Longer max boost already in effect");
            }
            ExtendOutcome::Contended => {
                self.core.stats.inc_max_contended();
                debug!(duration_ms, "Max boost extension lost under contention");
            }
        }
    }

    /// Cancel pending removals; clears all boost bits only if something was boosted
    pub fn unboost_all(&self) -> bool {
        self.core.unboost_all()
    }

    pub(super) fn handle_input(&self, event: InputEvent) {
        if !event.qualifies() || !self.core.state.contains(BoostFlags::SCREEN_AWAKE) {
            return;
        }
        self.kick();
        self.last_input_ms
            .store(self.core.clock.now_ms(), Ordering::Release);
    }

    pub(super) fn handle_display(&self, event: DisplayEvent) {
        match event {
            DisplayEvent::On => {
                self.core
                    .state
                    .set(BoostFlags::SCREEN_AWAKE | BoostFlags::WAKE_BOOST);
                self.kick_max(self.core.tunables.load().wake_boost_duration_ms);
                info!("Display on, wake boost requested");
            }
            DisplayEvent::Off => {
                self.core.state.clear(BoostFlags::SCREEN_AWAKE);
                self.unboost_all();
                info!("Display off, boosts removed");
            }
        }
    }

    pub fn flags(&self) -> BoostFlags {
        self.core.state.flags()
    }

    pub fn state(&self) -> &Arc<BoostState> {
        &self.core.state
    }

    pub fn max_boost_expiry(&self) -> Millis {
        self.core.state.max_boost_expiry()
    }

    /// Clock time of the last input event that kicked a boost, 0 if none
    pub fn last_input_ms(&self) -> Millis {
        self.last_input_ms.load(Ordering::Acquire)
    }

    pub fn tunables(&self) -> Arc<BoostTunables> {
        self.core.tunables.load_full()
    }

    /// Publish new tunables and re-evaluate every CPU's floor
    pub fn set_tunables(&self, tunables: BoostTunables) -> Result<(), ConfigError> {
        tunables.validate()?;
        self.core.tunables.store(Arc::new(tunables));
        if self.is_active() {
            self.core.refresh_policy();
        }
        Ok(())
    }

    pub fn stats(&self) -> BoostStats {
        self.core.stats.snapshot()
    }

    /// Whether the input-unboost and max-unboost removals are pending
    pub fn pending_removals(&self) -> (bool, bool) {
        (
            self.core.input_unboost.is_pending(),
            self.core.max_unboost.is_pending(),
        )
    }
}

impl Drop for BoostArbiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
