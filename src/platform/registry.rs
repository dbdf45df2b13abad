/*!
 * Registration Registry
 * Ordered list of registered hooks/handlers keyed by registration id
 */

use crate::boost::types::RegistrationId;
use crate::core::errors::PlatformError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub struct Registry<T: ?Sized> {
    name: &'static str,
    entries: RwLock<Vec<(RegistrationId, Arc<T>)>>,
    next_id: AtomicU64,
    refuse: AtomicBool,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            refuse: AtomicBool::new(false),
        }
    }

    pub fn register(&self, item: Arc<T>) -> Result<RegistrationId, PlatformError> {
        if self.refuse.load(Ordering::Acquire) {
            return Err(PlatformError::RegistrationRefused { registry: self.name });
        }
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, item));
        Ok(id)
    }

    pub fn unregister(&self, id: RegistrationId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Registered items in registration order, cloned out of the lock
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .iter()
            .map(|(_, item)| item.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Make subsequent registrations fail (failure injection)
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Release);
    }
}
