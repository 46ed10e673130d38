//! Scripted hot-plug source
//!
//! Plays back a fixed set of devices for enumeration, then hands out live
//! events injected through a channel. Clones share the same channel, so a
//! source factory can hand a fresh clone to every monitor run.

use std::sync::{Arc, Mutex, PoisonError};

use modem_hotplug::{DeviceEvent, HotplugError, HotplugSource};
use tokio::sync::mpsc;

/// Handle used to inject live events into a [`ScriptedHotplug`]
#[derive(Debug, Clone)]
pub struct HotplugInjector {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl HotplugInjector {
    /// Queue a live event; returns false once the source is gone
    pub fn inject(&self, event: DeviceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// A hot-plug source driven by a test script
#[derive(Debug, Clone)]
pub struct ScriptedHotplug {
    /// Devices reported by enumeration
    present: Arc<Mutex<Vec<DeviceEvent>>>,
    /// Live events
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DeviceEvent>>>,
}

impl ScriptedHotplug {
    /// Create a source whose enumeration reports `present`
    pub fn new(present: Vec<DeviceEvent>) -> (Self, HotplugInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            present: Arc::new(Mutex::new(present)),
            rx: Arc::new(Mutex::new(rx)),
        };
        (source, HotplugInjector { tx })
    }

    /// Replace the devices reported by the next enumeration
    pub fn set_present(&self, present: Vec<DeviceEvent>) {
        *self.present.lock().unwrap_or_else(PoisonError::into_inner) = present;
    }
}

impl HotplugSource for ScriptedHotplug {
    fn enumerate(&mut self) -> Result<Vec<DeviceEvent>, HotplugError> {
        Ok(self
            .present
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn try_next(&mut self) -> Result<Option<DeviceEvent>, HotplugError> {
        Ok(self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok())
    }
}
