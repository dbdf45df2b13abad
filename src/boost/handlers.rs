/*!
 * Collaborator Adapters
 * Input handler and display listener registered by the arbiter
 */

use super::arbiter::BoostArbiter;
use super::traits::{DisplayListener, InputHandler};
use super::types::{DisplayEvent, InputEvent};
use std::sync::Weak;

/// Kicks an input boost for qualifying events while the screen is awake
pub(super) struct ArbiterInputHandler {
    arbiter: Weak<BoostArbiter>,
}

impl ArbiterInputHandler {
    pub(super) fn new(arbiter: Weak<BoostArbiter>) -> Self {
        Self { arbiter }
    }
}

impl InputHandler for ArbiterInputHandler {
    fn on_input_event(&self, event: InputEvent) {
        if let Some(arbiter) = self.arbiter.upgrade() {
            arbiter.handle_input(event);
        }
    }
}

/// Wake boost on display on, unboost everything on display off
pub(super) struct ArbiterDisplayListener {
    arbiter: Weak<BoostArbiter>,
}

impl ArbiterDisplayListener {
    pub(super) fn new(arbiter: Weak<BoostArbiter>) -> Self {
        Self { arbiter }
    }
}

impl DisplayListener for ArbiterDisplayListener {
    fn on_display_event(&self, event: DisplayEvent) {
        if let Some(arbiter) = self.arbiter.upgrade() {
            arbiter.handle_display(event);
        }
    }
}
