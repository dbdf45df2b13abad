/*!
 * Boost Traits
 * Contracts of the collaborators around the boost arbiter
 */

use super::types::{CpuPolicy, DisplayEvent, InputEvent, NotifyAction, RegistrationId};
use crate::core::errors::PlatformError;
use crate::core::types::{CpuId, Millis};
use std::sync::Arc;

/// Invoked whenever the governor recomputes a CPU's allowed bounds.
///
/// Must be safe to call concurrently with any mutation of the boost state.
pub trait PolicyHook: Send + Sync {
    fn on_policy_adjust(&self, policy: &mut CpuPolicy) -> NotifyAction;
}

/// Frequency governor: owns the per-CPU policies and the hook chain
pub trait FrequencyGovernor: Send + Sync {
    /// Add a hook to the policy notifier chain
    fn register_hook(&self, hook: Arc<dyn PolicyHook>) -> Result<RegistrationId, PlatformError>;

    fn unregister_hook(&self, id: RegistrationId);

    fn online_cpus(&self) -> Vec<CpuId>;

    /// Re-run the hook chain for one CPU and apply the result
    fn update_policy(&self, cpu: CpuId) -> Result<(), PlatformError>;
}

/// Receives qualifying and non-qualifying input events
pub trait InputHandler: Send + Sync {
    fn on_input_event(&self, event: InputEvent);
}

/// Input subsystem
pub trait InputSource: Send + Sync {
    fn register_handler(
        &self,
        handler: Arc<dyn InputHandler>,
    ) -> Result<RegistrationId, PlatformError>;

    fn unregister_handler(&self, id: RegistrationId);
}

/// Receives display power transitions
pub trait DisplayListener: Send + Sync {
    fn on_display_event(&self, event: DisplayEvent);
}

/// Display power subsystem
pub trait DisplaySource: Send + Sync {
    fn register_listener(
        &self,
        listener: Arc<dyn DisplayListener>,
    ) -> Result<RegistrationId, PlatformError>;

    fn unregister_listener(&self, id: RegistrationId);
}

/// Memory-bus frequency booster
pub trait BusBoost: Send + Sync {
    fn kick_max(&self, duration_ms: Millis);
}
