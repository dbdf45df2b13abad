/*!
 * Boost Handle
 *
 * Explicit optional reference to the arbiter handed to every collaborator
 * that requests boosts. An empty handle turns `kick`/`kick_max` into no-ops.
 */

use super::arbiter::BoostArbiter;
use crate::core::errors::BoostError;
use crate::core::types::Millis;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone, Default)]
pub struct BoostHandle {
    arbiter: Option<Arc<BoostArbiter>>,
}

impl BoostHandle {
    pub fn new(arbiter: Arc<BoostArbiter>) -> Self {
        Self {
            arbiter: Some(arbiter),
        }
    }

    /// Handle for a disabled feature
    pub fn disabled() -> Self {
        Self { arbiter: None }
    }

    /// Keep the arbiter if it started; otherwise log and disable the feature
    pub fn from_start(result: Result<Arc<BoostArbiter>, BoostError>) -> Self {
        match result {
            Ok(arbiter) => Self::new(arbiter),
            Err(e) => {
                warn!(error = %e, "Boost arbiter unavailable, boosting disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.arbiter
            .as_ref()
            .map(|arbiter| arbiter.is_active())
            .unwrap_or(false)
    }

    pub fn arbiter(&self) -> Option<&Arc<BoostArbiter>> {
        self.arbiter.as_ref()
    }

    pub fn kick(&self) {
        if let Some(arbiter) = &self.arbiter {
            arbiter.kick();
        }
    }

    pub fn kick_max(&self, duration_ms: Millis) {
        if let Some(arbiter) = &self.arbiter {
            arbiter.kick_max(duration_ms);
        }
    }
}

impl std::fmt::Debug for BoostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostHandle")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
