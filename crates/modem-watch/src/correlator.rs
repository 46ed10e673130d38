//! Hot-plug event correlation
//!
//! Turns one kernel event into a registry change and, at most, one
//! lifecycle notification. The tty and net halves of a modem are merged by
//! keying every event on the USB device it belongs to rather than on the
//! leaf device that produced it.

use std::sync::Arc;
use std::time::Duration;

use modem_at::IdentifierRetriever;
use modem_hotplug::{subsystem, Action, DeviceEvent};
use tracing::{debug, info, trace, warn};

use crate::events::ModemEvent;
use crate::filter::FilterSet;
use crate::modem::Modem;
use crate::registry::Registry;

/// Registry change decided for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Store this record under `path`, replacing any previous one
    Upsert {
        /// USB device path
        path: String,
        /// Complete new record
        modem: Modem,
    },

    /// Drop the record under `path`
    Remove {
        /// USB device path
        path: String,
    },
}

/// Everything the correlator decided for one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Registry change to apply
    pub mutation: Option<Mutation>,
    /// Notification to deliver after the change is applied
    pub notification: Option<ModemEvent>,
}

impl Outcome {
    /// Outcome for an event that is not of interest
    pub fn ignored() -> Self {
        Self::default()
    }

    /// Check if the event changed nothing
    pub fn is_ignored(&self) -> bool {
        self.mutation.is_none() && self.notification.is_none()
    }
}

/// Decides what each hot-plug event means for the registry
pub struct Correlator {
    retriever: Arc<dyn IdentifierRetriever>,
    settle_delay: Duration,
}

impl Correlator {
    /// Create a correlator that identifies modems through `retriever`
    pub fn new(retriever: Arc<dyn IdentifierRetriever>, settle_delay: Duration) -> Self {
        Self {
            retriever,
            settle_delay,
        }
    }

    /// Decide the registry change and notification for `event`
    ///
    /// Nothing is written here; the caller applies the outcome. The only
    /// I/O is identifier retrieval for a modem's command port.
    pub async fn handle(
        &self,
        event: &DeviceEvent,
        filters: &FilterSet,
        registry: &Registry,
    ) -> Outcome {
        match &event.action {
            Action::Remove => return Self::handle_remove(event, registry),
            Action::Add | Action::Change => {}
            Action::Other(action) => {
                trace!("Ignoring {} event for {}", action, event.devnode);
                return Outcome::ignored();
            }
        }

        if !event.is_subsystem(subsystem::TTY) && !event.is_subsystem(subsystem::NET) {
            return Outcome::ignored();
        }

        let Some(usb) = &event.usb_device else {
            trace!("{} has no USB parent", event.devnode);
            return Outcome::ignored();
        };

        if !filters.matches(&usb.vendor_id, &usb.product_id) {
            trace!(
                "{} ({}:{}) matches no filter",
                event.devnode,
                usb.vendor_id,
                usb.product_id
            );
            return Outcome::ignored();
        }

        let path = usb.path.clone();
        let mut modem = registry.get(&path).unwrap_or_default();

        if event.is_subsystem(subsystem::NET) {
            debug!("Network interface {} belongs to {}", event.sysname, path);
            modem.network_interface = Some(event.sysname.clone());
            return Outcome {
                mutation: Some(Mutation::Upsert { path, modem }),
                notification: None,
            };
        }

        if !event.is_command_interface() {
            trace!(
                "{} is not a command interface (endpoints {:?})",
                event.devnode,
                event.interface_endpoints
            );
            return Outcome {
                mutation: Some(Mutation::Upsert { path, modem }),
                notification: None,
            };
        }

        if event.action == Action::Add && !self.settle_delay.is_zero() {
            debug!(
                "Waiting {:?} for {} to settle",
                self.settle_delay, event.devnode
            );
            tokio::time::sleep(self.settle_delay).await;
        }

        match self.retriever.retrieve_id(&event.devnode).await {
            Ok(id) => {
                info!("Modem {} identified on {} ({})", id, event.devnode, path);
                modem.serial_port = Some(event.devnode.clone());
                modem.hardware_id = Some(id);
            }
            Err(e) => {
                warn!("Failed to identify modem on {}: {}", event.devnode, e);
            }
        }

        let notification = if event.action == Action::Change {
            ModemEvent::Updated {
                path: path.clone(),
                modem: modem.clone(),
            }
        } else {
            ModemEvent::Added {
                path: path.clone(),
                modem: modem.clone(),
            }
        };

        Outcome {
            mutation: Some(Mutation::Upsert { path, modem }),
            notification: Some(notification),
        }
    }

    fn handle_remove(event: &DeviceEvent, registry: &Registry) -> Outcome {
        let Some(modem) = registry.get(&event.devnode) else {
            return Outcome::ignored();
        };

        info!("Modem at {} removed", event.devnode);
        Outcome {
            mutation: Some(Mutation::Remove {
                path: event.devnode.clone(),
            }),
            notification: Some(ModemEvent::Removed {
                path: event.devnode.clone(),
                modem,
            }),
        }
    }
}
