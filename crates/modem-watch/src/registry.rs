//! Device registry
//!
//! Maps the path of each tracked USB device to its current modem record.
//! Only the event loop writes; readers always get copies, and a write
//! replaces a whole record, so no reader ever sees a half-updated modem.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::correlator::Mutation;
use crate::modem::Modem;

/// Shared map from USB device path to modem record
#[derive(Debug, Default)]
pub struct Registry {
    devices: RwLock<HashMap<String, Modem>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Modem>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Modem>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the record for `path`
    pub fn get(&self, path: &str) -> Option<Modem> {
        self.read().get(path).cloned()
    }

    /// Insert or replace the record for `path`, returning the previous one
    pub fn insert(&self, path: impl Into<String>, modem: Modem) -> Option<Modem> {
        self.write().insert(path.into(), modem)
    }

    /// Remove the record for `path`
    pub fn remove(&self, path: &str) -> Option<Modem> {
        self.write().remove(path)
    }

    /// Apply a correlator decision
    pub fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::Upsert { path, modem } => {
                self.insert(path, modem);
            }
            Mutation::Remove { path } => {
                self.remove(&path);
            }
        }
    }

    /// Drop every record, returning how many there were
    pub fn clear(&self) -> usize {
        let mut devices = self.write();
        let count = devices.len();
        devices.clear();
        count
    }

    /// Number of records, ready or not
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the registry has no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record, including partial ones
    pub fn snapshot(&self) -> HashMap<String, Modem> {
        self.read().clone()
    }

    /// Copy of the ready records only
    pub fn ready(&self) -> HashMap<String, Modem> {
        self.read()
            .iter()
            .filter(|(_, modem)| modem.is_ready())
            .map(|(path, modem)| (path.clone(), modem.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_modem() -> Modem {
        Modem {
            network_interface: None,
            serial_port: Some("/dev/ttyUSB2".to_string()),
            hardware_id: Some("123456789012345".to_string()),
        }
    }

    #[test]
    fn test_ready_excludes_partial_records() {
        let registry = Registry::new();
        registry.insert("/dev/bus/usb/001/004", ready_modem());
        registry.insert(
            "/dev/bus/usb/001/005",
            Modem {
                network_interface: Some("wwan1".to_string()),
                ..Default::default()
            },
        );

        let ready = registry.ready();
        assert_eq!(registry.len(), 2);
        assert_eq!(ready.len(), 1);
        assert!(ready.contains_key("/dev/bus/usb/001/004"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = Registry::new();
        registry.insert("/dev/bus/usb/001/004", ready_modem());

        let mut snapshot = registry.snapshot();
        snapshot.clear();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_apply_and_clear() {
        let registry = Registry::new();
        registry.apply(Mutation::Upsert {
            path: "/dev/bus/usb/001/004".to_string(),
            modem: ready_modem(),
        });
        registry.apply(Mutation::Upsert {
            path: "/dev/bus/usb/001/005".to_string(),
            modem: Modem::default(),
        });
        registry.apply(Mutation::Remove {
            path: "/dev/bus/usb/001/005".to_string(),
        });

        assert_eq!(registry.get("/dev/bus/usb/001/004"), Some(ready_modem()));
        assert_eq!(registry.get("/dev/bus/usb/001/005"), None);
        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
    }
}
