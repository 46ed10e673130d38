//! Hot-plug event snapshots

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subsystem names used when matching devices
pub mod subsystem {
    /// Serial character devices
    pub const TTY: &str = "tty";
    /// Network interfaces
    pub const NET: &str = "net";
    /// USB topology nodes
    pub const USB: &str = "usb";
    /// Device type of a whole USB peripheral within the usb subsystem
    pub const USB_DEVICE: &str = "usb_device";
}

/// Endpoint count of the interface that accepts AT commands
///
/// Composite modems expose several serial interfaces; only the one with
/// three endpoints is the command interface.
pub const MODEM_COMMAND_ENDPOINTS: &str = "03";

/// What happened to a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Device appeared (also used for devices found by enumeration)
    Add,
    /// Device disappeared
    Remove,
    /// Device attributes changed
    Change,
    /// Any other kernel action (bind, unbind, move, ...)
    Other(String),
}

impl Action {
    /// Parse a kernel action string
    pub fn parse(action: &str) -> Self {
        match action {
            "add" => Action::Add,
            "remove" => Action::Remove,
            "change" => Action::Change,
            other => Action::Other(other.to_string()),
        }
    }

    /// Kernel name of this action
    pub fn as_str(&self) -> &str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Change => "change",
            Action::Other(other) => other,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The USB peripheral a device node belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDevice {
    /// Device-node path of the USB device (e.g., /dev/bus/usb/001/004)
    pub path: String,
    /// `idVendor` attribute, lowercase hex as reported by sysfs
    pub vendor_id: String,
    /// `idProduct` attribute
    pub product_id: String,
}

/// A single hot-plug notification with the attributes read at receive time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// What happened
    pub action: Action,
    /// Device-node path of the leaf device (syspath when it has no node)
    pub devnode: String,
    /// Subsystem of the leaf device
    pub subsystem: String,
    /// Short kernel name (e.g., ttyUSB2, wwan0)
    pub sysname: String,
    /// Nearest ancestor with subsystem `usb` and devtype `usb_device`
    pub usb_device: Option<UsbDevice>,
    /// `bNumEndpoints` of the leaf's grandparent (the USB interface for a TTY)
    pub interface_endpoints: Option<String>,
}

impl DeviceEvent {
    /// Check if this event reports a device going away
    pub fn is_remove(&self) -> bool {
        self.action == Action::Remove
    }

    /// Check if the leaf device belongs to `subsystem`
    pub fn is_subsystem(&self, subsystem: &str) -> bool {
        self.subsystem == subsystem
    }

    /// Check if the leaf sits on a modem's AT command interface
    pub fn is_command_interface(&self) -> bool {
        self.interface_endpoints.as_deref() == Some(MODEM_COMMAND_ENDPOINTS)
    }
}
