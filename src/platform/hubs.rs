/*!
 * Event Hubs
 *
 * In-process input and display sources. Whatever observes the real devices
 * (an evdev reader, a display HAL, the daemon's command channel) feeds events
 * here and the hubs dispatch them to the registered handlers.
 */

use super::registry::Registry;
use crate::boost::traits::{DisplayListener, DisplaySource, InputHandler, InputSource};
use crate::boost::types::{DisplayEvent, InputEvent, RegistrationId};
use crate::core::errors::PlatformError;
use log::debug;
use std::sync::Arc;

pub struct InputHub {
    handlers: Registry<dyn InputHandler>,
}

impl InputHub {
    pub fn new() -> Self {
        Self {
            handlers: Registry::new("input hub"),
        }
    }

    /// Dispatch an event to every registered handler
    pub fn emit(&self, event: InputEvent) {
        for handler in self.handlers.snapshot() {
            handler.on_input_event(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn refuse_registrations(&self, refuse: bool) {
        self.handlers.set_refuse(refuse);
    }
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for InputHub {
    fn register_handler(
        &self,
        handler: Arc<dyn InputHandler>,
    ) -> Result<RegistrationId, PlatformError> {
        let id = self.handlers.register(handler)?;
        debug!("Input handler {:?} registered", id);
        Ok(id)
    }

    fn unregister_handler(&self, id: RegistrationId) {
        if self.handlers.unregister(id) {
            debug!("Input handler {:?} unregistered", id);
        }
    }
}

pub struct DisplayHub {
    listeners: Registry<dyn DisplayListener>,
}

impl DisplayHub {
    pub fn new() -> Self {
        Self {
            listeners: Registry::new("display hub"),
        }
    }

    pub fn set_power(&self, event: DisplayEvent) {
        for listener in self.listeners.snapshot() {
            listener.on_display_event(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn refuse_registrations(&self, refuse: bool) {
        self.listeners.set_refuse(refuse);
    }
}

impl Default for DisplayHub {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySource for DisplayHub {
    fn register_listener(
        &self,
        listener: Arc<dyn DisplayListener>,
    ) -> Result<RegistrationId, PlatformError> {
        let id = self.listeners.register(listener)?;
        debug!("Display listener {:?} registered", id);
        Ok(id)
    }

    fn unregister_listener(&self, id: RegistrationId) {
        if self.listeners.unregister(id) {
            debug!("Display listener {:?} unregistered", id);
        }
    }
}
