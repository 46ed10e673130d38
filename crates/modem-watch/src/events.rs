//! Modem lifecycle events
//!
//! Every notification the correlator produces is delivered both to the
//! registered handlers and to subscribers of the manager's event stream.

use crate::modem::Modem;

/// Lifecycle event for one modem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemEvent {
    /// A modem's command port was seen on plug-in or enumeration
    Added {
        /// USB device path the modem is keyed by
        path: String,
        /// Record after the event (may not be ready)
        modem: Modem,
    },

    /// A modem's command port reported a change
    Updated {
        /// USB device path the modem is keyed by
        path: String,
        /// Record after the event (may not be ready)
        modem: Modem,
    },

    /// A modem was unplugged
    Removed {
        /// USB device path the modem was keyed by
        path: String,
        /// Last known record
        modem: Modem,
    },
}

impl ModemEvent {
    /// The modem this event is about
    pub fn modem(&self) -> &Modem {
        match self {
            ModemEvent::Added { modem, .. }
            | ModemEvent::Updated { modem, .. }
            | ModemEvent::Removed { modem, .. } => modem,
        }
    }

    /// USB device path of the modem
    pub fn path(&self) -> &str {
        match self {
            ModemEvent::Added { path, .. }
            | ModemEvent::Updated { path, .. }
            | ModemEvent::Removed { path, .. } => path,
        }
    }

    /// Check if this event reports an unplugged modem
    pub fn is_removal(&self) -> bool {
        matches!(self, ModemEvent::Removed { .. })
    }

    /// Short lowercase name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            ModemEvent::Added { .. } => "added",
            ModemEvent::Updated { .. } => "updated",
            ModemEvent::Removed { .. } => "removed",
        }
    }
}
