use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::resource::Identity;

/// Identities of resources that are (or recently were) bound to a session.
///
/// An instrument that is already open elsewhere cannot be opened again to ask
/// for its identity, so discovery answers from this cache instead. Entries are
/// advisory: a stale one disappears on the next [`prune`](Self::prune) once
/// the resource no longer shows up on the bus.
#[derive(Debug, Default)]
pub struct BusyRegistry {
    entries: Mutex<HashMap<String, Identity>>,
}

impl BusyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Identity>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, resource: &str) -> Option<Identity> {
        self.lock().get(resource).cloned()
    }

    pub fn insert(&self, resource: &str, identity: Identity) {
        log::debug!("Registering {} as {}", resource, identity);
        self.lock().insert(resource.to_string(), identity);
    }

    pub fn release(&self, resource: &str) -> Option<Identity> {
        self.lock().remove(resource)
    }

    /// Drop every entry whose resource is absent from `live`. Returns the
    /// number of entries removed.
    pub fn prune(&self, live: &[String]) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|resource, _| live.iter().any(|l| l == resource));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Pruned {} stale busy resource(s)", removed);
        }
        removed
    }

    pub fn resources(&self) -> Vec<String> {
        let mut resources: Vec<String> = self.lock().keys().cloned().collect();
        resources.sort();
        resources
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(serial: &str) -> Identity {
        Identity {
            manufacturer: "TEKTRONIX".to_string(),
            model: "TBS1072C".to_string(),
            serial_number: serial.to_string(),
            firmware: String::new(),
        }
    }

    #[test]
    fn test_prune_removes_absent_resources() {
        let registry = BusyRegistry::new();
        registry.insert("USB0::1689::964::A::INSTR", identity("A"));
        registry.insert("USB0::1689::964::B::INSTR", identity("B"));

        let removed = registry.prune(&["USB0::1689::964::B::INSTR".to_string()]);
        assert_eq!(removed, 1);
        assert!(registry.get("USB0::1689::964::A::INSTR").is_none());
        assert_eq!(
            registry.get("USB0::1689::964::B::INSTR").unwrap().serial_number,
            "B"
        );
    }

    #[test]
    fn test_release() {
        let registry = BusyRegistry::new();
        registry.insert("R", identity("A"));
        assert_eq!(registry.len(), 1);
        assert!(registry.release("R").is_some());
        assert!(registry.is_empty());
    }
}
